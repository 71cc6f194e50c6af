//! Object-style entry point
//!
//! [`NvApi`] loads NVAPI, enumerates the GPUs and hands out [`Gpu`] objects.

use crate::error::NvapiError;
use crate::gpu::{Gpu, GpuRegistry};
use crate::nvapi::interface::{Nvapi, NvapiCalls};
use crate::nvapi::lifecycle::Lifecycle;
use crate::nvapi::load::check;
use crate::nvapi::resolver::{InterfaceResolver, LibraryResolver};
use crate::nvapi::types::{read_short_string, ShortString, SHORT_STRING_SIZE};
use crate::nvapi::FunctionId;

use std::sync::Arc;

/// Loaded NVAPI with at least one GPU
pub struct NvApi {
    calls: Arc<dyn NvapiCalls>,
    registry: GpuRegistry,
}

impl NvApi {
    /// Load the vendor library under its default name
    pub fn new() -> Result<Self, NvapiError> {
        let resolver = LibraryResolver::load_default()?;
        Self::with_resolver(Arc::new(resolver))
    }

    /// Load the vendor library under the first of `names` that opens
    pub fn with_library_names<S: AsRef<str>>(names: &[S]) -> Result<Self, NvapiError> {
        let resolver = LibraryResolver::load(names)?;
        Self::with_resolver(Arc::new(resolver))
    }

    /// Initialize NVAPI through `resolver`
    pub fn with_resolver(resolver: Arc<dyn InterfaceResolver>) -> Result<Self, NvapiError> {
        let nvapi = Nvapi::initialize(resolver)?;
        Self::with_calls(Arc::new(nvapi))
    }

    /// Use the NVAPI instance owned by `lifecycle`, loading it if needed
    pub fn from_lifecycle(lifecycle: &Lifecycle) -> Result<Self, NvapiError> {
        let nvapi: Arc<dyn NvapiCalls> = lifecycle.acquire()?;
        Self::with_calls(nvapi)
    }

    /// Enumerate GPUs over an already initialized call layer
    pub fn with_calls(calls: Arc<dyn NvapiCalls>) -> Result<Self, NvapiError> {
        let registry = GpuRegistry::new(Arc::clone(&calls));
        if registry.gpu_count()? == 0 {
            return Err(NvapiError::NoGpusFound);
        }
        Ok(Self { calls, registry })
    }

    /// NVAPI interface version string
    pub fn interface_version(&self) -> Result<String, NvapiError> {
        let mut buffer: ShortString = [0; SHORT_STRING_SIZE];
        check(
            FunctionId::GetInterfaceVersionString,
            self.calls.interface_version_string(&mut buffer),
        )?;
        Ok(read_short_string(&buffer))
    }

    pub fn gpu_count(&self) -> usize {
        self.gpus().len()
    }

    /// GPU at `index`, `None` if out of range
    pub fn gpu(&self, index: usize) -> Option<Arc<Gpu>> {
        self.gpus().get(index).cloned()
    }

    /// Every GPU in enumeration order
    pub fn gpus(&self) -> Vec<Arc<Gpu>> {
        // Enumeration succeeded during construction and is cached from then on
        self.registry.gpus().unwrap_or_default()
    }

    /// Position of the GPU with driver ID `gpu_id`
    pub fn index_for_gpu_id(&self, gpu_id: u32) -> Option<usize> {
        self.gpus().iter().position(|gpu| gpu.gpu_id() == gpu_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockNvapi;
    use crate::nvapi::status::NvStatus;

    #[test]
    fn test_with_calls() {
        let mock = Arc::new(MockNvapi::new(2));
        let api = NvApi::with_calls(mock).unwrap();
        assert_eq!(api.gpu_count(), 2);
        assert!(api.gpu(0).is_some());
        assert!(api.gpu(2).is_none());
        assert_eq!(api.index_for_gpu_id(0x101), Some(1));
        assert_eq!(api.index_for_gpu_id(0x42), None);
    }

    #[test]
    fn test_zero_gpus_fails() {
        let mock = Arc::new(MockNvapi::new(0));
        assert_eq!(
            NvApi::with_calls(mock).err(),
            Some(NvapiError::NoGpusFound)
        );
    }

    #[test]
    fn test_interface_version() {
        let mock = Arc::new(MockNvapi::new(1));
        let api = NvApi::with_calls(mock.clone()).unwrap();
        assert_eq!(api.interface_version().unwrap(), "NVidia Complete Version 1.10");

        mock.fail_call(FunctionId::GetInterfaceVersionString, NvStatus::ERROR);
        assert!(api.interface_version().is_err());
    }

    #[test]
    fn test_missing_library() {
        let result = NvApi::with_library_names(&["no-such-nvapi.dll"]);
        assert!(matches!(result, Err(NvapiError::LibraryNotFound(_))));
    }

    #[test]
    #[ignore = "Requires NVIDIA driver"]
    fn test_real_hardware() {
        let api = NvApi::new().unwrap();
        assert!(api.gpu_count() > 0);
    }
}
