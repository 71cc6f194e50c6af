//! Info command implementation
//!
//! Shows identity, voltage, temperature and current clocks per GPU.

use super::polled_gpus;
use crate::api::NvApi;
use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, GpuInfoOutput};
use crate::error::Result;
use crate::gpu::Gpu;

/// Execute the info command
pub fn run_info(api: &NvApi, format: OutputFormat, gpu_index: Option<usize>) -> Result<()> {
    for (idx, gpu) in polled_gpus(api, gpu_index)? {
        print_output(&gpu_info(idx, &gpu)?, format)?;
    }
    Ok(())
}

fn gpu_info(idx: usize, gpu: &Gpu) -> Result<GpuInfoOutput> {
    Ok(GpuInfoOutput {
        gpu_index: idx,
        gpu_id: gpu.gpu_id(),
        name: gpu.name()?,
        serial_number: gpu.serial_number().ok(),
        voltage_mv: gpu.voltage(),
        temperature_c: gpu.temperature(),
        clocks: gpu.clocks(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockNvapi;
    use std::sync::Arc;

    #[test]
    fn test_gpu_info() {
        let mock = Arc::new(MockNvapi::new(1));
        let api = NvApi::with_calls(mock).unwrap();
        let (idx, gpu) = polled_gpus(&api, Some(0)).unwrap().remove(0);

        let info = gpu_info(idx, &gpu).unwrap();
        assert_eq!(info.name, "NVIDIA GeForce Mock 0");
        assert_eq!(info.temperature_c, 65.0);
        assert_eq!(info.voltage_mv, 850.0);
        assert_eq!(info.clocks.core, 1350.0);
    }
}
