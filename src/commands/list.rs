//! List command implementation
//!
//! Lists all detected NVIDIA GPUs.

use crate::api::NvApi;
use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, GpuList, GpuListEntry};
use crate::error::Result;

/// Execute the list command
pub fn run_list(api: &NvApi, format: OutputFormat) -> Result<()> {
    let gpu_list = build_list(api)?;
    print_output(&gpu_list, format)?;
    Ok(())
}

fn build_list(api: &NvApi) -> Result<GpuList> {
    let interface_version = api.interface_version()?;

    let gpus = api
        .gpus()
        .iter()
        .enumerate()
        .map(|(index, gpu)| GpuListEntry {
            index,
            gpu_id: gpu.gpu_id(),
            name: gpu.name().unwrap_or_else(|e| {
                log::debug!("Name of GPU {} unavailable: {}", index, e);
                "Unknown".to_string()
            }),
        })
        .collect();

    Ok(GpuList {
        gpus,
        interface_version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockNvapi;
    use crate::nvapi::status::NvStatus;
    use crate::nvapi::FunctionId;
    use std::sync::Arc;

    #[test]
    fn test_build_list() {
        let mock = Arc::new(MockNvapi::new(2));
        let api = NvApi::with_calls(mock.clone()).unwrap();

        mock.fail_call(FunctionId::GetFullName, NvStatus::ERROR);
        let list = build_list(&api).unwrap();
        assert_eq!(list.gpus.len(), 2);
        assert_eq!(list.gpus[1].gpu_id, 0x101);
        assert_eq!(list.gpus[0].name, "Unknown");
        assert!(list.interface_version.starts_with("NVidia"));
    }
}
