//! Clocks command implementation

use super::polled_gpus;
use crate::api::NvApi;
use crate::cli::args::{ClockKindArg, ClocksArgs, OutputFormat};
use crate::cli::output::{print_output, ClocksOutput};
use crate::domain::GpuClocks;
use crate::error::Result;
use crate::gpu::Gpu;

/// Execute the clocks command
pub fn run_clocks(
    args: &ClocksArgs,
    api: &NvApi,
    format: OutputFormat,
    gpu_index: Option<usize>,
) -> Result<()> {
    for (idx, gpu) in polled_gpus(api, gpu_index)? {
        let output = ClocksOutput {
            gpu_index: idx,
            kind: kind_label(args.kind).to_string(),
            clocks: clocks_for(&gpu, args.kind),
        };
        print_output(&output, format)?;
    }
    Ok(())
}

fn clocks_for(gpu: &Gpu, kind: ClockKindArg) -> GpuClocks {
    match kind {
        ClockKindArg::Current => gpu.clocks(),
        ClockKindArg::Default => gpu.default_clocks(),
        ClockKindArg::Base => gpu.base_clocks(),
        ClockKindArg::Boost => gpu.boost_clocks(),
    }
}

fn kind_label(kind: ClockKindArg) -> &'static str {
    match kind {
        ClockKindArg::Current => "Current",
        ClockKindArg::Default => "Default",
        ClockKindArg::Base => "Base",
        ClockKindArg::Boost => "Boost",
    }
}
