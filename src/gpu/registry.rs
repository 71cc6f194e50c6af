//! GPU handle registry
//!
//! Enumerates physical GPUs on first access and keeps one [`Gpu`] per handle.
//! Finding no GPUs is not cached, so a later access enumerates again.

use super::device::Gpu;
use crate::error::NvapiError;
use crate::nvapi::interface::NvapiCalls;
use crate::nvapi::load::check;
use crate::nvapi::status::NvStatus;
use crate::nvapi::types::{PhysicalGpuHandle, MAX_PHYSICAL_GPUS};
use crate::nvapi::FunctionId;

use std::sync::{Arc, Mutex};

/// Lazily populated list of GPUs
pub struct GpuRegistry {
    calls: Arc<dyn NvapiCalls>,
    gpus: Mutex<Option<Vec<Arc<Gpu>>>>,
}

impl GpuRegistry {
    pub fn new(calls: Arc<dyn NvapiCalls>) -> Self {
        Self {
            calls,
            gpus: Mutex::new(None),
        }
    }

    fn enumerate(&self) -> Result<Vec<PhysicalGpuHandle>, NvapiError> {
        let mut handles = [PhysicalGpuHandle::NULL; MAX_PHYSICAL_GPUS];
        let mut count = 0u32;
        let status = self.calls.enum_physical_gpus(&mut handles, &mut count);

        if status == NvStatus::NVIDIA_DEVICE_NOT_FOUND {
            return Ok(Vec::new());
        }
        check(FunctionId::EnumPhysicalGpus, status)?;

        let count = (count as usize).min(MAX_PHYSICAL_GPUS);
        Ok(handles[..count].to_vec())
    }

    /// All GPUs, enumerating them if not done yet
    pub fn gpus(&self) -> Result<Vec<Arc<Gpu>>, NvapiError> {
        let mut gpus = self.gpus.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(gpus) = gpus.as_ref() {
            return Ok(gpus.clone());
        }

        let handles = self.enumerate()?;
        if handles.is_empty() {
            log::debug!("No GPUs enumerated, will retry on next access");
            return Ok(Vec::new());
        }

        let loaded = handles
            .into_iter()
            .map(|handle| Gpu::new(Arc::clone(&self.calls), handle).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!("Found {} GPU(s)", loaded.len());
        *gpus = Some(loaded.clone());
        Ok(loaded)
    }

    pub fn gpu_count(&self) -> Result<usize, NvapiError> {
        Ok(self.gpus()?.len())
    }

    /// GPU at `index`, `None` if out of range
    pub fn gpu(&self, index: usize) -> Result<Option<Arc<Gpu>>, NvapiError> {
        Ok(self.gpus()?.get(index).cloned())
    }

    /// Position of the GPU with driver ID `gpu_id`
    pub fn index_for_gpu_id(&self, gpu_id: u32) -> Result<Option<usize>, NvapiError> {
        Ok(self.gpus()?.iter().position(|gpu| gpu.gpu_id() == gpu_id))
    }

    /// Whether enumeration has produced a cached list
    pub fn is_loaded(&self) -> bool {
        self.gpus.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}
