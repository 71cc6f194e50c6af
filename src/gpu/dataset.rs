//! Polled GPU records
//!
//! A [`Dataset`] is built in one go by [`Dataset::poll`]. If any record fails
//! to load, no dataset is produced.

use crate::domain::ClockFrequencyType;
use crate::error::NvapiError;
use crate::nvapi::interface::NvapiCalls;
use crate::nvapi::load::{fetch, fetch_with};
use crate::nvapi::types::{
    ClockFrequencies, DynamicPstates, PhysicalGpuHandle, PowerPoliciesInfo, PowerPoliciesStatus,
    Pstates20, ThermalPoliciesInfo, ThermalPoliciesStatus, ThermalSettings, VoltageDomainsStatus,
    THERMAL_TARGET_ALL,
};
use crate::nvapi::version::VersionedStruct;
use crate::nvapi::FunctionId;

/// Snapshot of every record polled for one GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dataset {
    /// Indexed by [`ClockFrequencyType::selector`]
    pub frequencies: [ClockFrequencies; 3],
    pub dynamic_pstates: DynamicPstates,
    pub pstates20: Pstates20,
    pub power_info: PowerPoliciesInfo,
    pub power_status: PowerPoliciesStatus,
    pub voltage_status: VoltageDomainsStatus,
    pub thermal_settings: ThermalSettings,
    pub thermal_info: ThermalPoliciesInfo,
    pub thermal_status: ThermalPoliciesStatus,
}

impl Dataset {
    /// Load every record for `gpu`, stopping at the first failure
    pub fn poll(calls: &dyn NvapiCalls, gpu: PhysicalGpuHandle) -> Result<Self, NvapiError> {
        let mut frequencies = [ClockFrequencies::stamped(); 3];
        for kind in ClockFrequencyType::ALL {
            frequencies[kind.selector() as usize] = fetch_with(
                FunctionId::GetAllClockFrequencies,
                |f: &mut ClockFrequencies| f.clock_type = kind.selector(),
                |f| calls.all_clock_frequencies(gpu, f),
            )?;
        }

        Ok(Self {
            frequencies,
            dynamic_pstates: fetch(FunctionId::GetDynamicPstatesInfoEx, |v| {
                calls.dynamic_pstates_info(gpu, v)
            })?,
            pstates20: fetch(FunctionId::GetPstates20, |v| calls.pstates20(gpu, v))?,
            power_info: fetch(FunctionId::ClientPowerPoliciesGetInfo, |v| {
                calls.power_policies_info(gpu, v)
            })?,
            power_status: fetch(FunctionId::ClientPowerPoliciesGetStatus, |v| {
                calls.power_policies_status(gpu, v)
            })?,
            voltage_status: fetch(FunctionId::GetVoltageDomainsStatus, |v| {
                calls.voltage_domains_status(gpu, v)
            })?,
            thermal_settings: fetch(FunctionId::GetThermalSettings, |v| {
                calls.thermal_settings(gpu, THERMAL_TARGET_ALL as u32, v)
            })?,
            thermal_info: fetch(FunctionId::ClientThermalPoliciesGetInfo, |v| {
                calls.thermal_policies_info(gpu, v)
            })?,
            thermal_status: fetch(FunctionId::ClientThermalPoliciesGetStatus, |v| {
                calls.thermal_policies_status(gpu, v)
            })?,
        })
    }

    /// Clock table for one frequency type
    pub fn frequencies(&self, kind: ClockFrequencyType) -> &ClockFrequencies {
        &self.frequencies[kind.selector() as usize]
    }
}

/// Every call a poll makes, in order
#[cfg(test)]
pub(crate) const POLL_CALLS: [FunctionId; 9] = [
    FunctionId::GetAllClockFrequencies,
    FunctionId::GetDynamicPstatesInfoEx,
    FunctionId::GetPstates20,
    FunctionId::ClientPowerPoliciesGetInfo,
    FunctionId::ClientPowerPoliciesGetStatus,
    FunctionId::GetVoltageDomainsStatus,
    FunctionId::GetThermalSettings,
    FunctionId::ClientThermalPoliciesGetInfo,
    FunctionId::ClientThermalPoliciesGetStatus,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockNvapi;
    use crate::nvapi::status::NvStatus;

    #[test]
    fn test_poll_loads_every_record() {
        let mock = MockNvapi::new(1);
        let handle = mock.gpu(0).handle;

        let dataset = Dataset::poll(&mock, handle).unwrap();

        assert_eq!(mock.call_count(FunctionId::GetAllClockFrequencies), 3);
        for call in &POLL_CALLS[1..] {
            assert_eq!(mock.call_count(*call), 1, "{}", call);
        }

        let gpu = mock.gpu(0);
        assert_eq!(dataset.frequencies(ClockFrequencyType::Base), &gpu.clocks[1]);
        assert_eq!(dataset.frequencies(ClockFrequencyType::Boost).clock_type, 2);
        assert_eq!(dataset.pstates20, gpu.pstates20);
        assert_eq!(dataset.thermal_status, gpu.thermal_status);
    }

    #[test]
    fn test_poll_fails_on_any_record() {
        for call in POLL_CALLS {
            let mock = MockNvapi::new(1);
            let handle = mock.gpu(0).handle;
            mock.fail_call(call, NvStatus::NOT_SUPPORTED);

            let err = Dataset::poll(&mock, handle).unwrap_err();
            assert_eq!(
                err,
                NvapiError::Call {
                    call,
                    status: NvStatus::NOT_SUPPORTED
                }
            );
        }
    }

    #[test]
    fn test_poll_stops_at_first_failure() {
        let mock = MockNvapi::new(1);
        let handle = mock.gpu(0).handle;
        mock.fail_call(FunctionId::GetPstates20, NvStatus::ERROR);

        assert!(Dataset::poll(&mock, handle).is_err());
        assert_eq!(mock.call_count(FunctionId::ClientPowerPoliciesGetInfo), 0);
    }

    #[test]
    fn test_poll_unknown_handle() {
        let mock = MockNvapi::new(1);
        let err = Dataset::poll(&mock, PhysicalGpuHandle::from_raw(0xBAD)).unwrap_err();
        assert_eq!(err.status(), Some(NvStatus::EXPECTED_PHYSICAL_GPU_HANDLE));
    }
}
