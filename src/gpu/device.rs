//! GPU device object
//!
//! A [`Gpu`] pairs a driver handle with its last successfully polled
//! [`Dataset`]. Only the registry constructs one.

use super::dataset::Dataset;
use super::metrics;
use super::overclock::OverclockPlan;
use crate::domain::{
    ClockFrequencyType, GpuClocks, GpuUsage, OverclockProfile, OverclockRequest, UNAVAILABLE,
};
use crate::error::{NvapiError, OverclockError};
use crate::nvapi::interface::NvapiCalls;
use crate::nvapi::load::{check, fetch};
use crate::nvapi::types::{
    read_short_string, BoardInfo, PhysicalGpuHandle, ShortString, SHORT_STRING_SIZE,
};
use crate::nvapi::FunctionId;

use std::fmt;
use std::sync::{Arc, RwLock};

/// One physical GPU
pub struct Gpu {
    calls: Arc<dyn NvapiCalls>,
    handle: PhysicalGpuHandle,
    gpu_id: u32,
    dataset: RwLock<Option<Arc<Dataset>>>,
}

impl Gpu {
    /// Resolve the GPU ID for `handle`; a GPU without one is unusable
    pub(super) fn new(calls: Arc<dyn NvapiCalls>, handle: PhysicalGpuHandle) -> Result<Self, NvapiError> {
        let mut gpu_id = 0;
        let status = calls.gpu_id(handle, &mut gpu_id);
        if !status.is_ok() {
            log::debug!(
                "{} failed for handle {:#x}: {}",
                FunctionId::GetGpuIdFromPhysicalGpu,
                handle.as_raw(),
                status
            );
            return Err(NvapiError::GpuIdUnavailable(status));
        }

        Ok(Self {
            calls,
            handle,
            gpu_id,
            dataset: RwLock::new(None),
        })
    }

    pub fn handle(&self) -> PhysicalGpuHandle {
        self.handle
    }

    /// Stable driver-assigned GPU ID
    pub fn gpu_id(&self) -> u32 {
        self.gpu_id
    }

    /// Poll every record and publish the new dataset
    ///
    /// On failure the previous dataset stays in place.
    pub fn try_poll(&self) -> Result<(), NvapiError> {
        let dataset = Dataset::poll(self.calls.as_ref(), self.handle)?;
        *self.dataset.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(dataset));
        Ok(())
    }

    /// [`Gpu::try_poll`] reduced to success or failure
    pub fn poll(&self) -> bool {
        match self.try_poll() {
            Ok(()) => {
                log::debug!("Polled GPU {:#x}", self.gpu_id);
                true
            }
            Err(e) => {
                log::debug!("Poll of GPU {:#x} failed: {}", self.gpu_id, e);
                false
            }
        }
    }

    /// Last successfully polled dataset
    pub fn dataset(&self) -> Option<Arc<Dataset>> {
        self.dataset.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn read<T>(&self, default: T, f: impl FnOnce(&Dataset) -> T) -> T {
        self.dataset().map_or(default, |dataset| f(&dataset))
    }

    /// Full marketing name, fetched on every call
    pub fn name(&self) -> Result<String, NvapiError> {
        let mut buffer: ShortString = [0; SHORT_STRING_SIZE];
        check(
            FunctionId::GetFullName,
            self.calls.full_name(self.handle, &mut buffer),
        )?;
        Ok(read_short_string(&buffer))
    }

    /// Board serial number as uppercase hex, fetched on every call
    pub fn serial_number(&self) -> Result<String, NvapiError> {
        let info: BoardInfo = fetch(FunctionId::GetBoardInfo, |info| {
            self.calls.board_info(self.handle, info)
        })?;
        Ok(metrics::serial_hex(&info.board_num))
    }

    /// Core voltage in mV, `-1` if unknown
    pub fn voltage(&self) -> f32 {
        self.read(UNAVAILABLE, metrics::voltage)
    }

    /// GPU temperature in °C, `-1` if unknown
    pub fn temperature(&self) -> f32 {
        self.read(UNAVAILABLE, metrics::temperature)
    }

    /// Clocks from `kind`'s table, optionally including the active offsets
    pub fn clocks_of(&self, kind: ClockFrequencyType, compensate: bool) -> GpuClocks {
        self.read(GpuClocks::unavailable(), |d| metrics::clocks(d, kind, compensate))
    }

    /// Current clocks
    pub fn clocks(&self) -> GpuClocks {
        self.clocks_of(ClockFrequencyType::Current, false)
    }

    /// Factory base clocks without any overclock
    pub fn default_clocks(&self) -> GpuClocks {
        self.clocks_of(ClockFrequencyType::Base, false)
    }

    /// Base clocks including the active overclock
    pub fn base_clocks(&self) -> GpuClocks {
        self.clocks_of(ClockFrequencyType::Base, true)
    }

    /// Boost clocks including the active overclock
    pub fn boost_clocks(&self) -> GpuClocks {
        self.clocks_of(ClockFrequencyType::Boost, true)
    }

    pub fn overclock_profile(&self) -> OverclockProfile {
        self.read(OverclockProfile::default(), metrics::overclock_profile)
    }

    pub fn usage(&self) -> GpuUsage {
        self.read(GpuUsage::unavailable(), metrics::usage)
    }

    /// Validate and stage `request` without submitting it
    ///
    /// Polls first if nothing has been polled yet.
    pub fn plan_overclock(&self, request: &OverclockRequest) -> Result<OverclockPlan, OverclockError> {
        let dataset = match self.dataset() {
            Some(dataset) => dataset,
            None => {
                self.try_poll().map_err(OverclockError::NoDataset)?;
                self.dataset()
                    .ok_or(OverclockError::NoDataset(NvapiError::NotInitialized))?
            }
        };
        OverclockPlan::build(&dataset, request)
    }

    /// Apply `request` as one transaction, then re-poll
    pub fn set_overclock(&self, request: &OverclockRequest) -> Result<(), OverclockError> {
        let plan = self.plan_overclock(request)?;
        let attempted = plan.submission_count() > 0;
        let result = plan.submit(self.calls.as_ref(), self.handle);

        if attempted {
            if let Err(e) = self.try_poll() {
                log::warn!("Re-poll of GPU {:#x} after overclock failed: {}", self.gpu_id, e);
            }
        }

        match &result {
            Ok(()) => log::info!("Applied overclock on GPU {:#x}", self.gpu_id),
            Err(e) => log::debug!("Overclock on GPU {:#x} failed: {}", self.gpu_id, e),
        }
        result
    }
}

impl fmt::Debug for Gpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gpu")
            .field("handle", &format_args!("{:#x}", self.handle.as_raw()))
            .field("gpu_id", &self.gpu_id)
            .field("polled", &self.dataset().is_some())
            .finish()
    }
}
