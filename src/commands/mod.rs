//! Command handlers
//!
//! Each command handler orchestrates the execution of a CLI command.

pub mod clocks;
pub mod info;
pub mod list;
pub mod overclock;
pub mod profile;
pub mod usage;
pub mod watch;

pub use clocks::run_clocks;
pub use info::run_info;
pub use list::run_list;
pub use overclock::run_overclock;
pub use profile::run_profile;
pub use usage::run_usage;
pub use watch::run_watch;

use crate::api::NvApi;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::gpu::Gpu;

use std::sync::Arc;

/// Load NVAPI under the configured library names
pub fn load_api(config: &Config) -> Result<NvApi> {
    Ok(NvApi::with_library_names(&config.library.names)?)
}

/// GPUs selected by `--gpu`, or every GPU, with their indices
pub fn selected_gpus(api: &NvApi, gpu_index: Option<usize>) -> Result<Vec<(usize, Arc<Gpu>)>> {
    match gpu_index {
        Some(idx) => api
            .gpu(idx)
            .map(|gpu| vec![(idx, gpu)])
            .ok_or(AppError::GpuNotFound(idx)),
        None => Ok(api.gpus().into_iter().enumerate().collect()),
    }
}

/// Selected GPUs, each freshly polled
pub(crate) fn polled_gpus(api: &NvApi, gpu_index: Option<usize>) -> Result<Vec<(usize, Arc<Gpu>)>> {
    let gpus = selected_gpus(api, gpu_index)?;
    for (_, gpu) in &gpus {
        gpu.try_poll()?;
    }
    Ok(gpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockNvapi;
    use crate::nvapi::status::NvStatus;
    use crate::nvapi::FunctionId;

    fn api(count: usize) -> (Arc<MockNvapi>, NvApi) {
        let mock = Arc::new(MockNvapi::new(count));
        let api = NvApi::with_calls(mock.clone()).unwrap();
        (mock, api)
    }

    #[test]
    fn test_selected_all() {
        let (_, api) = api(3);
        let gpus = selected_gpus(&api, None).unwrap();
        let indices: Vec<usize> = gpus.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_selected_one() {
        let (_, api) = api(3);
        let gpus = selected_gpus(&api, Some(2)).unwrap();
        assert_eq!(gpus.len(), 1);
        assert_eq!(gpus[0].1.gpu_id(), 0x102);
    }

    #[test]
    fn test_selected_out_of_range() {
        let (_, api) = api(1);
        assert!(matches!(
            selected_gpus(&api, Some(4)),
            Err(AppError::GpuNotFound(4))
        ));
    }

    #[test]
    fn test_polled_gpus_propagates_failure() {
        let (mock, api) = api(1);
        mock.fail_call(FunctionId::GetPstates20, NvStatus::ERROR);
        assert!(matches!(polled_gpus(&api, None), Err(AppError::Nvapi(_))));
    }
}
