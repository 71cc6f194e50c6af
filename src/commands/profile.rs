//! Profile command implementation
//!
//! Shows what can be adjusted on each GPU and within which range.

use super::polled_gpus;
use crate::api::NvApi;
use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, ProfileOutput};
use crate::error::Result;

/// Execute the profile command
pub fn run_profile(api: &NvApi, format: OutputFormat, gpu_index: Option<usize>) -> Result<()> {
    for (idx, gpu) in polled_gpus(api, gpu_index)? {
        let output = ProfileOutput {
            gpu_index: idx,
            profile: gpu.overclock_profile(),
        };
        print_output(&output, format)?;
    }
    Ok(())
}
