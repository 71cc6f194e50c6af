//! Usage command implementation

use super::polled_gpus;
use crate::api::NvApi;
use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, UsageOutput};
use crate::error::Result;

/// Execute the usage command
pub fn run_usage(api: &NvApi, format: OutputFormat, gpu_index: Option<usize>) -> Result<()> {
    for (idx, gpu) in polled_gpus(api, gpu_index)? {
        let output = UsageOutput {
            gpu_index: idx,
            usage: gpu.usage(),
        };
        print_output(&output, format)?;
    }
    Ok(())
}
