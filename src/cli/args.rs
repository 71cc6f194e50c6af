//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands.

use crate::domain::{OverclockArea, OverclockRequest};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// NVAPI-based GPU overclocking tool
///
/// Read clocks, utilization and overclock ranges of NVIDIA GPUs and apply
/// clock, voltage, power and thermal offsets.
#[derive(Parser, Debug)]
#[command(name = "nvoc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "NVOC_CONFIG")]
    pub config: Option<String>,

    /// Target GPU by index (0-based)
    #[arg(long, global = true)]
    pub gpu: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all detected GPUs
    List,

    /// Show name, serial, voltage, temperature and clocks
    Info,

    /// Show clock frequencies
    Clocks(ClocksArgs),

    /// Show utilization per subsystem
    Usage,

    /// Show adjustable settings and their ranges
    Profile,

    /// Apply an overclock
    Overclock(OverclockArgs),

    /// Print readings repeatedly through the rate-limited poller
    Watch(WatchArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the clocks command
#[derive(Parser, Debug)]
pub struct ClocksArgs {
    /// Which clock table to show
    #[arg(short, long, value_enum, default_value = "current")]
    pub kind: ClockKindArg,
}

/// Clock table argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockKindArg {
    /// Clocks the GPU runs at right now
    Current,
    /// Factory base clocks without offsets
    Default,
    /// Base clocks including offsets
    Base,
    /// Boost clocks including offsets
    Boost,
}

/// Arguments for the overclock command
#[derive(Parser, Debug, Default)]
pub struct OverclockArgs {
    /// Core clock offset in MHz
    #[arg(long, allow_negative_numbers = true)]
    pub core: Option<f32>,

    /// Memory clock offset in MHz
    #[arg(long, allow_negative_numbers = true)]
    pub memory: Option<f32>,

    /// Shader clock offset in MHz
    #[arg(long, allow_negative_numbers = true)]
    pub shader: Option<f32>,

    /// Core voltage offset in mV
    #[arg(long, allow_negative_numbers = true)]
    pub overvolt: Option<f32>,

    /// Power limit in percent of rated board power
    #[arg(long)]
    pub power_limit: Option<f32>,

    /// Thermal limit in °C
    #[arg(long)]
    pub thermal_limit: Option<f32>,

    /// Start from the [overclock] preset in the config file
    #[arg(long)]
    pub preset: bool,

    /// Validate and show the staged changes without applying them
    #[arg(long)]
    pub dry_run: bool,
}

impl OverclockArgs {
    /// Flags given on the command line, by area
    pub fn values(&self) -> [(OverclockArea, Option<f32>); 6] {
        [
            (OverclockArea::Core, self.core),
            (OverclockArea::Memory, self.memory),
            (OverclockArea::Shader, self.shader),
            (OverclockArea::Overvolt, self.overvolt),
            (OverclockArea::PowerLimit, self.power_limit),
            (OverclockArea::ThermalLimit, self.thermal_limit),
        ]
    }

    /// Request holding only the flags given on the command line
    pub fn to_request(&self) -> OverclockRequest {
        self.values()
            .into_iter()
            .filter_map(|(area, value)| value.map(|v| (area, v)))
            .collect()
    }
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Milliseconds between readings
    #[arg(short, long, default_value = "1000")]
    pub interval_ms: u64,

    /// Stop after this many readings
    #[arg(short = 'n', long)]
    pub count: Option<u64>,
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
