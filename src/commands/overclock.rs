//! Overclock command implementation
//!
//! Builds a request from the config preset and command-line flags, then
//! either shows the staged transaction or applies it.

use super::selected_gpus;
use crate::api::NvApi;
use crate::cli::args::{OutputFormat, OverclockArgs};
use crate::cli::output::{print_output, OverclockOutput};
use crate::config::Config;
use crate::domain::OverclockRequest;
use crate::error::Result;
use crate::gpu::Gpu;

/// Execute the overclock command
pub fn run_overclock(
    args: &OverclockArgs,
    config: &Config,
    api: &NvApi,
    format: OutputFormat,
    gpu_index: Option<usize>,
) -> Result<()> {
    let request = build_request(args, config);
    log::debug!("Overclock request: {:?}", request);

    for (idx, gpu) in selected_gpus(api, gpu_index)? {
        let output = apply(idx, &gpu, &request, args.dry_run)?;
        print_output(&output, format)?;
    }

    Ok(())
}

/// Preset values (with `--preset`) overridden by explicit flags
fn build_request(args: &OverclockArgs, config: &Config) -> OverclockRequest {
    let mut request = if args.preset {
        config.overclock.to_request()
    } else {
        OverclockRequest::new()
    };

    for (area, value) in args.values() {
        if let Some(v) = value {
            request.set(area, v);
        }
    }

    request
}

fn apply(idx: usize, gpu: &Gpu, request: &OverclockRequest, dry_run: bool) -> Result<OverclockOutput> {
    gpu.try_poll()?;
    let changes = gpu.plan_overclock(request)?.changes().to_vec();

    if !dry_run {
        gpu.set_overclock(request)?;
    }

    Ok(OverclockOutput {
        gpu_index: idx,
        dry_run,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OverclockArea;
    use crate::error::{AppError, OverclockError};
    use crate::mock::MockNvapi;
    use crate::nvapi::FunctionId;
    use std::sync::Arc;

    fn gpu() -> (Arc<MockNvapi>, Arc<Gpu>) {
        let mock = Arc::new(MockNvapi::new(1));
        let api = NvApi::with_calls(mock.clone()).unwrap();
        let gpu = api.gpu(0).unwrap();
        (mock, gpu)
    }

    #[test]
    fn test_flags_override_preset() {
        let mut config = Config::default();
        config.overclock.core_mhz = Some(50.0);
        config.overclock.memory_mhz = Some(300.0);

        let args = OverclockArgs {
            core: Some(75.0),
            preset: true,
            ..Default::default()
        };
        let request = build_request(&args, &config);
        assert_eq!(request.get(OverclockArea::Core), Some(75.0));
        assert_eq!(request.get(OverclockArea::Memory), Some(300.0));

        let args = OverclockArgs {
            core: Some(75.0),
            ..Default::default()
        };
        assert_eq!(build_request(&args, &config).len(), 1);
    }

    #[test]
    fn test_dry_run_submits_nothing() {
        let (mock, gpu) = gpu();
        let request = OverclockRequest::new().with(OverclockArea::Core, 100.0);

        let output = apply(0, &gpu, &request, true).unwrap();
        assert!(output.dry_run);
        assert_eq!(output.changes.len(), 1);
        assert_eq!(output.changes[0].raw, 100_000);
        assert_eq!(mock.call_count(FunctionId::SetPstates20), 0);
    }

    #[test]
    fn test_apply_submits() {
        let (mock, gpu) = gpu();
        let request = OverclockRequest::new().with(OverclockArea::Core, 100.0);

        apply(0, &gpu, &request, false).unwrap();
        assert_eq!(mock.call_count(FunctionId::SetPstates20), 1);
        assert_eq!(gpu.overclock_profile().core.current, 100.0);
    }

    #[test]
    fn test_empty_request_fails() {
        let (_, gpu) = gpu();
        let result = apply(0, &gpu, &OverclockRequest::new(), false);
        assert!(matches!(
            result,
            Err(AppError::Overclock(OverclockError::EmptyRequest))
        ));
    }
}
