//! CLI argument parsing and output formatting
//!
//! Arguments are defined with clap derive; every command prints through
//! [`output::print_output`] in the selected [`OutputFormat`].

pub mod args;
pub mod output;

pub use args::{Cli, Commands, OutputFormat};
