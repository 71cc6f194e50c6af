//! Raw call layer
//!
//! One typed method per vendor operation. Each takes the GPU handle and a
//! versioned record that the caller has already stamped, and returns the raw
//! status. On failure the record contents are unspecified.

use crate::error::NvapiError;
use crate::nvapi::ids::FunctionId;
use crate::nvapi::resolver::InterfaceResolver;
use crate::nvapi::status::NvStatus;
use crate::nvapi::types::{
    BoardInfo, ClockFrequencies, DynamicPstates, PhysicalGpuHandle, PowerPoliciesInfo,
    PowerPoliciesStatus, Pstates20, ShortString, ThermalPoliciesInfo, ThermalPoliciesStatus,
    ThermalSettings, VoltageDomainsStatus, MAX_PHYSICAL_GPUS,
};

use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::os::raw::c_char;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Trait for the raw NVAPI operations
///
/// Implemented by [`Nvapi`] against the real driver and by the mock in tests.
pub trait NvapiCalls: Send + Sync {
    /// Fill `handles` with the physical GPUs and store how many in `count`
    fn enum_physical_gpus(
        &self,
        handles: &mut [PhysicalGpuHandle; MAX_PHYSICAL_GPUS],
        count: &mut u32,
    ) -> NvStatus;

    fn interface_version_string(&self, buffer: &mut ShortString) -> NvStatus;

    fn gpu_id(&self, gpu: PhysicalGpuHandle, id: &mut u32) -> NvStatus;

    fn full_name(&self, gpu: PhysicalGpuHandle, name: &mut ShortString) -> NvStatus;

    fn board_info(&self, gpu: PhysicalGpuHandle, info: &mut BoardInfo) -> NvStatus;

    /// The selector travels in `frequencies.clock_type`
    fn all_clock_frequencies(
        &self,
        gpu: PhysicalGpuHandle,
        frequencies: &mut ClockFrequencies,
    ) -> NvStatus;

    fn dynamic_pstates_info(&self, gpu: PhysicalGpuHandle, info: &mut DynamicPstates)
        -> NvStatus;

    fn pstates20(&self, gpu: PhysicalGpuHandle, pstates: &mut Pstates20) -> NvStatus;

    fn set_pstates20(&self, gpu: PhysicalGpuHandle, pstates: &mut Pstates20) -> NvStatus;

    fn power_policies_info(&self, gpu: PhysicalGpuHandle, info: &mut PowerPoliciesInfo)
        -> NvStatus;

    fn power_policies_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut PowerPoliciesStatus,
    ) -> NvStatus;

    fn set_power_policies_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut PowerPoliciesStatus,
    ) -> NvStatus;

    fn voltage_domains_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut VoltageDomainsStatus,
    ) -> NvStatus;

    /// `sensor_index` is a thermal target mask; `THERMAL_TARGET_ALL` reads every sensor
    fn thermal_settings(
        &self,
        gpu: PhysicalGpuHandle,
        sensor_index: u32,
        settings: &mut ThermalSettings,
    ) -> NvStatus;

    fn thermal_policies_info(
        &self,
        gpu: PhysicalGpuHandle,
        info: &mut ThermalPoliciesInfo,
    ) -> NvStatus;

    fn thermal_policies_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut ThermalPoliciesStatus,
    ) -> NvStatus;

    fn set_thermal_policies_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut ThermalPoliciesStatus,
    ) -> NvStatus;
}

type NoArgFn = unsafe extern "C" fn() -> i32;
type EnumGpusFn = unsafe extern "C" fn(*mut PhysicalGpuHandle, *mut u32) -> i32;
type StringFn = unsafe extern "C" fn(*mut c_char) -> i32;
type GpuStringFn = unsafe extern "C" fn(PhysicalGpuHandle, *mut c_char) -> i32;
type GpuStructFn<T> = unsafe extern "C" fn(PhysicalGpuHandle, *mut T) -> i32;
type GpuSelectorStructFn<T> = unsafe extern "C" fn(PhysicalGpuHandle, u32, *mut T) -> i32;

/// NVAPI bound to a resolver, with a per-ID function cache
pub struct Nvapi {
    resolver: Arc<dyn InterfaceResolver>,
    // FunctionId -> function address
    cache: Mutex<HashMap<FunctionId, usize>>,
    unloaded: AtomicBool,
}

impl Nvapi {
    /// Bind to `resolver` and run `NvAPI_Initialize`
    pub fn initialize(resolver: Arc<dyn InterfaceResolver>) -> Result<Self, NvapiError> {
        let nvapi = Self {
            resolver,
            cache: Mutex::new(HashMap::new()),
            unloaded: AtomicBool::new(false),
        };

        // SAFETY: NvAPI_Initialize takes no arguments
        let Some(init) = (unsafe { nvapi.entry::<NoArgFn>(FunctionId::Initialize) }) else {
            // Never initialized, so drop must not unload
            nvapi.unloaded.store(true, Ordering::SeqCst);
            return Err(NvapiError::SymbolNotFound(
                FunctionId::Initialize.name().to_string(),
            ));
        };

        // SAFETY: resolved from the catalog with the matching signature
        let status = NvStatus::from_raw(unsafe { init() });
        if !status.is_ok() {
            // Nothing to unload; the driver never came up
            nvapi.unloaded.store(true, Ordering::SeqCst);
            return Err(NvapiError::InitializationFailed(status));
        }

        log::debug!("NVAPI initialized");
        Ok(nvapi)
    }

    /// Run `NvAPI_Unload`; later calls are no-ops
    pub fn unload(&self) -> NvStatus {
        if self.unloaded.swap(true, Ordering::SeqCst) {
            return NvStatus::OK;
        }

        // SAFETY: NvAPI_Unload takes no arguments
        let status = match unsafe { self.entry::<NoArgFn>(FunctionId::Unload) } {
            // SAFETY: resolved from the catalog with the matching signature
            Some(unload) => NvStatus::from_raw(unsafe { unload() }),
            None => NvStatus::NO_IMPLEMENTATION,
        };

        log::info!("NVAPI unloaded: {}", status);
        status
    }

    /// Whether [`Nvapi::unload`] has run
    pub fn is_unloaded(&self) -> bool {
        self.unloaded.load(Ordering::SeqCst)
    }

    /// Resolve (or fetch from cache) the entry point for `function`
    ///
    /// # Safety
    ///
    /// `F` must be the function pointer type matching the entry point's
    /// signature.
    unsafe fn entry<F: Copy>(&self, function: FunctionId) -> Option<F> {
        debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<usize>());

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let address = match cache.get(&function) {
            Some(address) => *address,
            None => {
                let Some(entry) = self.resolver.resolve(function.id()) else {
                    log::debug!("{} is not available", function);
                    return None;
                };
                let address = entry.as_ptr() as usize;
                cache.insert(function, address);
                address
            }
        };

        Some(mem::transmute_copy::<usize, F>(&address))
    }

    fn call_struct<T>(&self, function: FunctionId, gpu: PhysicalGpuHandle, value: &mut T) -> NvStatus {
        // SAFETY: every struct entry point takes (handle, *mut T)
        match unsafe { self.entry::<GpuStructFn<T>>(function) } {
            // SAFETY: `value` is a live, exclusively borrowed record
            Some(f) => NvStatus::from_raw(unsafe { f(gpu, value) }),
            None => NvStatus::NO_IMPLEMENTATION,
        }
    }
}

impl fmt::Debug for Nvapi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nvapi")
            .field("unloaded", &self.is_unloaded())
            .finish_non_exhaustive()
    }
}

impl Drop for Nvapi {
    fn drop(&mut self) {
        self.unload();
    }
}

impl NvapiCalls for Nvapi {
    fn enum_physical_gpus(
        &self,
        handles: &mut [PhysicalGpuHandle; MAX_PHYSICAL_GPUS],
        count: &mut u32,
    ) -> NvStatus {
        // SAFETY: NvAPI_EnumPhysicalGPUs takes (NvPhysicalGpuHandle[64], NvU32*)
        match unsafe { self.entry::<EnumGpusFn>(FunctionId::EnumPhysicalGpus) } {
            // SAFETY: the array holds NVAPI_MAX_PHYSICAL_GPUS entries
            Some(f) => NvStatus::from_raw(unsafe { f(handles.as_mut_ptr(), count) }),
            None => NvStatus::NO_IMPLEMENTATION,
        }
    }

    fn interface_version_string(&self, buffer: &mut ShortString) -> NvStatus {
        // SAFETY: NvAPI_GetInterfaceVersionString takes (NvAPI_ShortString)
        match unsafe { self.entry::<StringFn>(FunctionId::GetInterfaceVersionString) } {
            // SAFETY: the buffer is a full short string
            Some(f) => NvStatus::from_raw(unsafe { f(buffer.as_mut_ptr()) }),
            None => NvStatus::NO_IMPLEMENTATION,
        }
    }

    fn gpu_id(&self, gpu: PhysicalGpuHandle, id: &mut u32) -> NvStatus {
        self.call_struct(FunctionId::GetGpuIdFromPhysicalGpu, gpu, id)
    }

    fn full_name(&self, gpu: PhysicalGpuHandle, name: &mut ShortString) -> NvStatus {
        // SAFETY: NvAPI_GPU_GetFullName takes (handle, NvAPI_ShortString)
        match unsafe { self.entry::<GpuStringFn>(FunctionId::GetFullName) } {
            // SAFETY: the buffer is a full short string
            Some(f) => NvStatus::from_raw(unsafe { f(gpu, name.as_mut_ptr()) }),
            None => NvStatus::NO_IMPLEMENTATION,
        }
    }

    fn board_info(&self, gpu: PhysicalGpuHandle, info: &mut BoardInfo) -> NvStatus {
        self.call_struct(FunctionId::GetBoardInfo, gpu, info)
    }

    fn all_clock_frequencies(
        &self,
        gpu: PhysicalGpuHandle,
        frequencies: &mut ClockFrequencies,
    ) -> NvStatus {
        self.call_struct(FunctionId::GetAllClockFrequencies, gpu, frequencies)
    }

    fn dynamic_pstates_info(
        &self,
        gpu: PhysicalGpuHandle,
        info: &mut DynamicPstates,
    ) -> NvStatus {
        self.call_struct(FunctionId::GetDynamicPstatesInfoEx, gpu, info)
    }

    fn pstates20(&self, gpu: PhysicalGpuHandle, pstates: &mut Pstates20) -> NvStatus {
        self.call_struct(FunctionId::GetPstates20, gpu, pstates)
    }

    fn set_pstates20(&self, gpu: PhysicalGpuHandle, pstates: &mut Pstates20) -> NvStatus {
        self.call_struct(FunctionId::SetPstates20, gpu, pstates)
    }

    fn power_policies_info(
        &self,
        gpu: PhysicalGpuHandle,
        info: &mut PowerPoliciesInfo,
    ) -> NvStatus {
        self.call_struct(FunctionId::ClientPowerPoliciesGetInfo, gpu, info)
    }

    fn power_policies_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut PowerPoliciesStatus,
    ) -> NvStatus {
        self.call_struct(FunctionId::ClientPowerPoliciesGetStatus, gpu, status)
    }

    fn set_power_policies_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut PowerPoliciesStatus,
    ) -> NvStatus {
        self.call_struct(FunctionId::ClientPowerPoliciesSetStatus, gpu, status)
    }

    fn voltage_domains_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut VoltageDomainsStatus,
    ) -> NvStatus {
        self.call_struct(FunctionId::GetVoltageDomainsStatus, gpu, status)
    }

    fn thermal_settings(
        &self,
        gpu: PhysicalGpuHandle,
        sensor_index: u32,
        settings: &mut ThermalSettings,
    ) -> NvStatus {
        // SAFETY: NvAPI_GPU_GetThermalSettings takes (handle, NvU32, *settings)
        match unsafe {
            self.entry::<GpuSelectorStructFn<ThermalSettings>>(FunctionId::GetThermalSettings)
        } {
            // SAFETY: `settings` is a live, exclusively borrowed record
            Some(f) => NvStatus::from_raw(unsafe { f(gpu, sensor_index, settings) }),
            None => NvStatus::NO_IMPLEMENTATION,
        }
    }

    fn thermal_policies_info(
        &self,
        gpu: PhysicalGpuHandle,
        info: &mut ThermalPoliciesInfo,
    ) -> NvStatus {
        self.call_struct(FunctionId::ClientThermalPoliciesGetInfo, gpu, info)
    }

    fn thermal_policies_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut ThermalPoliciesStatus,
    ) -> NvStatus {
        self.call_struct(FunctionId::ClientThermalPoliciesGetStatus, gpu, status)
    }

    fn set_thermal_policies_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut ThermalPoliciesStatus,
    ) -> NvStatus {
        self.call_struct(FunctionId::ClientThermalPoliciesSetStatus, gpu, status)
    }
}
