//! nvoc - NVAPI-based GPU overclocking tool
//!
//! A command-line tool for reading NVIDIA GPU clocks, utilization and
//! overclock ranges, and for applying clock, voltage, power and thermal
//! offsets.

use clap::Parser;
use nvoc::cli::args::{generate_completions, Cli, Commands};
use nvoc::commands::{
    load_api, run_clocks, run_info, run_list, run_overclock, run_profile, run_usage, run_watch,
};
use nvoc::config::{Config, ConfigBuilder};
use nvoc::error::{AppError, NvapiError};
use nvoc::simple::PollingContext;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Run the appropriate command
    let result = load_config(&cli).and_then(|config| {
        // Set log level based on verbose flag or config
        if config.general.verbose {
            log::set_max_level(log::LevelFilter::Debug);
        }
        run(&cli, &config)
    });

    if let Err(e) = result {
        log::error!("{}", e);
        print_error(&e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config, AppError> {
    let config = ConfigBuilder::new()
        .with_file(cli.config.as_deref())?
        .with_verbose(cli.verbose.then_some(true))
        .build();
    Ok(config)
}

fn run(cli: &Cli, config: &Config) -> Result<(), AppError> {
    match &cli.command {
        Commands::List => run_list(&load_api(config)?, cli.format),

        Commands::Info => run_info(&load_api(config)?, cli.format, cli.gpu),

        Commands::Clocks(args) => run_clocks(args, &load_api(config)?, cli.format, cli.gpu),

        Commands::Usage => run_usage(&load_api(config)?, cli.format, cli.gpu),

        Commands::Profile => run_profile(&load_api(config)?, cli.format, cli.gpu),

        Commands::Overclock(args) => {
            run_overclock(args, config, &load_api(config)?, cli.format, cli.gpu)
        }

        Commands::Watch(args) => {
            let context = PollingContext::from_config(config);
            let result = run_watch(args, &context, cli.format, cli.gpu);
            context.shutdown();
            result
        }

        Commands::Completions { shell } => {
            generate_completions(*shell);
            Ok(())
        }
    }
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        AppError::Nvapi(NvapiError::LibraryNotFound(_)) => {
            eprintln!();
            eprintln!("Hint: Make sure the NVIDIA driver is installed.");
            eprintln!("      NVAPI ships with the Windows driver as nvapi64.dll.");
            eprintln!("      Other names can be set under [library] in the config file.");
        }
        AppError::Nvapi(NvapiError::NoGpusFound) => {
            eprintln!();
            eprintln!("Hint: Make sure you have an NVIDIA GPU installed.");
            eprintln!("      Check 'nvidia-smi' for GPU detection.");
        }
        AppError::Nvapi(e) if e.status() == Some(nvoc::nvapi::NvStatus::INVALID_USER_PRIVILEGE) => {
            eprintln!();
            eprintln!("Hint: Try running as Administrator.");
        }
        AppError::Overclock(nvoc::error::OverclockError::OutOfRange { .. })
        | AppError::Overclock(nvoc::error::OverclockError::NotEditable(_)) => {
            eprintln!();
            eprintln!("Hint: Run 'nvoc profile' to see the adjustable ranges.");
        }
        _ => {}
    }
}
