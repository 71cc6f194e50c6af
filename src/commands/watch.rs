//! Watch command implementation
//!
//! Prints readings in a loop through a [`PollingContext`], so the GPU is
//! polled at most once per configured interval however fast the loop runs.

use crate::cli::args::{OutputFormat, WatchArgs};
use crate::cli::output::{print_output, WatchSample};
use crate::error::{AppError, NvapiError, Result};
use crate::simple::PollingContext;

use std::thread;
use std::time::Duration;

/// Execute the watch command
pub fn run_watch(
    args: &WatchArgs,
    context: &PollingContext,
    format: OutputFormat,
    gpu_index: Option<usize>,
) -> Result<()> {
    if !context.init() {
        return Err(NvapiError::NoGpusFound.into());
    }

    let indices: Vec<usize> = match gpu_index {
        Some(idx) if idx < context.gpu_count() => vec![idx],
        Some(idx) => return Err(AppError::GpuNotFound(idx)),
        None => (0..context.gpu_count()).collect(),
    };

    let interval = Duration::from_millis(args.interval_ms);
    log::info!(
        "Watching {} GPU(s) every {:?} (poll interval {:?})",
        indices.len(),
        interval,
        context.min_interval()
    );

    let mut taken = 0;
    loop {
        for &idx in &indices {
            print_output(&sample(context, idx), format)?;
        }

        taken += 1;
        if args.count.is_some_and(|count| taken >= count) {
            break;
        }

        thread::sleep(interval);
    }

    Ok(())
}

fn sample(context: &PollingContext, idx: usize) -> WatchSample {
    WatchSample {
        gpu_index: idx,
        clocks: context.clocks(idx),
        usage: context.usage(idx),
        temperature_c: context.temperature(idx),
        voltage_mv: context.voltage(idx),
    }
}
