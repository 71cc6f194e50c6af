//! Mock implementations for testing
//!
//! Provides an in-memory [`NvapiCalls`] implementation serving canned records
//! for a configurable set of GPUs, with per-call failure injection and call
//! counters.

use crate::nvapi::ids::FunctionId;
use crate::nvapi::interface::NvapiCalls;
use crate::nvapi::status::NvStatus;
use crate::nvapi::types::*;
use crate::nvapi::version::VersionedStruct;

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

/// Canned records for one mock GPU
#[derive(Debug, Clone)]
pub struct MockGpu {
    pub handle: PhysicalGpuHandle,
    pub gpu_id: u32,
    pub name: String,
    pub board_num: [u8; 16],
    /// Indexed by clock-frequency selector (current, base, boost)
    pub clocks: [ClockFrequencies; 3],
    pub dynamic_pstates: DynamicPstates,
    pub pstates20: Pstates20,
    pub power_info: PowerPoliciesInfo,
    pub power_status: PowerPoliciesStatus,
    pub voltage_status: VoltageDomainsStatus,
    pub thermal_settings: ThermalSettings,
    pub thermal_info: ThermalPoliciesInfo,
    pub thermal_status: ThermalPoliciesStatus,
}

fn frequencies(selector: u32, core_khz: u32, memory_khz: u32) -> ClockFrequencies {
    let mut freq = ClockFrequencies::stamped();
    freq.clock_type = selector;
    freq.entries[CLOCK_DOMAIN_GRAPHICS as usize] = ClockFrequencyEntry {
        present: 1,
        freq: core_khz,
    };
    freq.entries[CLOCK_DOMAIN_MEMORY as usize] = ClockFrequencyEntry {
        present: 1,
        freq: memory_khz,
    };
    freq
}

fn pstate(state_num: u32, flags: u32) -> Pstates20State {
    let mut state = Pstates20State {
        state_num,
        flags,
        ..Default::default()
    };
    state.clocks[0] = Pstates20ClockEntry {
        domain: CLOCK_DOMAIN_GRAPHICS,
        clock_type: CLOCK_TYPE_DYNAMIC,
        freq_delta: DeltaEntry::new(0, -200_000, 200_000),
        min_or_single_freq: 300_000,
        max_freq: 2_000_000,
        voltage_domain: 0,
        ..Default::default()
    };
    state.clocks[1] = Pstates20ClockEntry {
        domain: CLOCK_DOMAIN_MEMORY,
        freq_delta: DeltaEntry::new(0, -500_000, 1_000_000),
        min_or_single_freq: 3_500_000,
        ..Default::default()
    };
    state
}

impl MockGpu {
    /// A GPU with plausible defaults: core 1350 MHz, memory 3500 MHz, no
    /// shader clock, editable core/memory/overvolt/power/thermal settings
    pub fn new(index: usize) -> Self {
        let mut pstates20 = Pstates20::stamped();
        pstates20.state_count = 2;
        pstates20.clock_count = 2;
        pstates20.states[0] = pstate(0, 1);
        pstates20.states[1] = pstate(8, 0);
        pstates20.over_volt.voltage_count = 1;
        pstates20.over_volt.voltages[0] = Pstates20VoltageEntry {
            domain: 0,
            flags: 1,
            voltage: 850_000,
            volt_delta: DeltaEntry::new(0, 0, 100_000),
        };

        let mut dynamic_pstates = DynamicPstates::stamped();
        dynamic_pstates.flags = 1;
        dynamic_pstates.utilization[UTILIZATION_GPU] = UtilizationEntry {
            present: 1,
            value: 37,
        };
        dynamic_pstates.utilization[UTILIZATION_FRAME_BUFFER] = UtilizationEntry {
            present: 1,
            value: 12,
        };
        dynamic_pstates.utilization[UTILIZATION_BUS_INTERFACE] = UtilizationEntry {
            present: 1,
            value: 3,
        };

        let mut power_info = PowerPoliciesInfo::stamped();
        power_info.valid = 1;
        power_info.count = 1;
        power_info.entries[0] = PowerPolicyInfoEntry {
            pstate_id: 0,
            min_power: 50_000,
            default_power: 100_000,
            max_power: 120_000,
            ..Default::default()
        };

        let mut power_status = PowerPoliciesStatus::stamped();
        power_status.count = 1;
        power_status.entries[0] = PowerPolicyStatusEntry {
            pstate_id: 0,
            power: 100_000,
            ..Default::default()
        };

        let mut voltage_status = VoltageDomainsStatus::stamped();
        voltage_status.count = 1;
        voltage_status.entries[0] = VoltageDomainEntry {
            voltage_domain: 0,
            current_voltage: 850_000,
        };

        let mut thermal_settings = ThermalSettings::stamped();
        thermal_settings.count = 1;
        thermal_settings.sensors[0] = ThermalSensor {
            controller: THERMAL_CONTROLLER_GPU_INTERNAL,
            default_min_temp: 0,
            default_max_temp: 127,
            current_temp: 65,
            target: THERMAL_TARGET_GPU,
        };

        let mut thermal_info = ThermalPoliciesInfo::stamped();
        thermal_info.count = 1;
        thermal_info.flags = 1;
        thermal_info.entries[0] = ThermalPolicyInfoEntry {
            controller: THERMAL_CONTROLLER_GPU_INTERNAL,
            min_temp: 65 << 8,
            default_temp: 83 << 8,
            max_temp: 91 << 8,
            ..Default::default()
        };

        let mut thermal_status = ThermalPoliciesStatus::stamped();
        thermal_status.count = 1;
        thermal_status.entries[0] = ThermalPolicyStatusEntry {
            controller: THERMAL_CONTROLLER_GPU_INTERNAL,
            value: 83 << 8,
            flags: 1,
        };

        let mut board_num = [0u8; 16];
        board_num[0] = 0xAB;
        board_num[1] = 0xCD;
        board_num[15] = index as u8;

        Self {
            handle: PhysicalGpuHandle::from_raw(0x1000 * (index + 1)),
            gpu_id: 0x100 + index as u32,
            name: format!("NVIDIA GeForce Mock {}", index),
            board_num,
            clocks: [
                frequencies(0, 1_350_000, 3_500_000),
                frequencies(1, 1_200_000, 3_500_000),
                frequencies(2, 1_500_000, 3_500_000),
            ],
            dynamic_pstates,
            pstates20,
            power_info,
            power_status,
            voltage_status,
            thermal_settings,
            thermal_info,
            thermal_status,
        }
    }
}

/// In-memory NVAPI for unit tests
#[derive(Debug, Default)]
pub struct MockNvapi {
    gpus: RwLock<Vec<MockGpu>>,
    failures: Mutex<HashMap<FunctionId, NvStatus>>,
    calls: Mutex<HashMap<FunctionId, usize>>,
    last_pstates20: Mutex<Option<Pstates20>>,
    last_power_status: Mutex<Option<PowerPoliciesStatus>>,
    last_thermal_status: Mutex<Option<ThermalPoliciesStatus>>,
}

impl MockNvapi {
    /// Mock with `count` default GPUs
    pub fn new(count: usize) -> Self {
        Self::with_gpus((0..count).map(MockGpu::new).collect())
    }

    pub fn with_gpus(gpus: Vec<MockGpu>) -> Self {
        Self {
            gpus: RwLock::new(gpus),
            ..Default::default()
        }
    }

    /// Make every later call to `call` return `status`
    pub fn fail_call(&self, call: FunctionId, status: NvStatus) {
        self.failures.lock().unwrap().insert(call, status);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Number of times `call` was invoked
    pub fn call_count(&self, call: FunctionId) -> usize {
        self.calls.lock().unwrap().get(&call).copied().unwrap_or(0)
    }

    /// Mutate the canned records of GPU `index`
    pub fn update_gpu(&self, index: usize, update: impl FnOnce(&mut MockGpu)) {
        update(&mut self.gpus.write().unwrap()[index]);
    }

    pub fn set_gpus(&self, gpus: Vec<MockGpu>) {
        *self.gpus.write().unwrap() = gpus;
    }

    pub fn gpu(&self, index: usize) -> MockGpu {
        self.gpus.read().unwrap()[index].clone()
    }

    pub fn last_pstates20(&self) -> Option<Pstates20> {
        *self.last_pstates20.lock().unwrap()
    }

    pub fn last_power_status(&self) -> Option<PowerPoliciesStatus> {
        *self.last_power_status.lock().unwrap()
    }

    pub fn last_thermal_status(&self) -> Option<ThermalPoliciesStatus> {
        *self.last_thermal_status.lock().unwrap()
    }

    /// Count the call and return any injected failure
    fn enter(&self, call: FunctionId) -> Option<NvStatus> {
        *self.calls.lock().unwrap().entry(call).or_insert(0) += 1;
        self.failures.lock().unwrap().get(&call).copied()
    }

    fn serve<T, F>(&self, call: FunctionId, gpu: PhysicalGpuHandle, out: &mut T, pick: F) -> NvStatus
    where
        T: VersionedStruct,
        F: FnOnce(&MockGpu) -> T,
    {
        if let Some(status) = self.enter(call) {
            return status;
        }
        if out.version() != T::expected_version() {
            return NvStatus::INCOMPATIBLE_STRUCT_VERSION;
        }

        let gpus = self.gpus.read().unwrap();
        let Some(mock) = gpus.iter().find(|g| g.handle == gpu) else {
            return NvStatus::EXPECTED_PHYSICAL_GPU_HANDLE;
        };

        let version = out.version();
        *out = pick(mock);
        out.set_version(version);
        NvStatus::OK
    }

    fn apply<T, F>(&self, call: FunctionId, gpu: PhysicalGpuHandle, input: &T, apply: F) -> NvStatus
    where
        T: VersionedStruct,
        F: FnOnce(&mut MockGpu, &T),
    {
        if let Some(status) = self.enter(call) {
            return status;
        }
        if input.version() != T::expected_version() {
            return NvStatus::INCOMPATIBLE_STRUCT_VERSION;
        }

        let mut gpus = self.gpus.write().unwrap();
        let Some(mock) = gpus.iter_mut().find(|g| g.handle == gpu) else {
            return NvStatus::EXPECTED_PHYSICAL_GPU_HANDLE;
        };

        apply(mock, input);
        NvStatus::OK
    }
}

impl NvapiCalls for MockNvapi {
    fn enum_physical_gpus(
        &self,
        handles: &mut [PhysicalGpuHandle; MAX_PHYSICAL_GPUS],
        count: &mut u32,
    ) -> NvStatus {
        if let Some(status) = self.enter(FunctionId::EnumPhysicalGpus) {
            return status;
        }
        let gpus = self.gpus.read().unwrap();
        let n = gpus.len().min(MAX_PHYSICAL_GPUS);
        for (slot, gpu) in handles.iter_mut().zip(gpus.iter()) {
            *slot = gpu.handle;
        }
        *count = n as u32;
        NvStatus::OK
    }

    fn interface_version_string(&self, buffer: &mut ShortString) -> NvStatus {
        if let Some(status) = self.enter(FunctionId::GetInterfaceVersionString) {
            return status;
        }
        write_short_string(buffer, "NVidia Complete Version 1.10");
        NvStatus::OK
    }

    fn gpu_id(&self, gpu: PhysicalGpuHandle, id: &mut u32) -> NvStatus {
        if let Some(status) = self.enter(FunctionId::GetGpuIdFromPhysicalGpu) {
            return status;
        }
        match self.gpus.read().unwrap().iter().find(|g| g.handle == gpu) {
            Some(mock) => {
                *id = mock.gpu_id;
                NvStatus::OK
            }
            None => NvStatus::EXPECTED_PHYSICAL_GPU_HANDLE,
        }
    }

    fn full_name(&self, gpu: PhysicalGpuHandle, name: &mut ShortString) -> NvStatus {
        if let Some(status) = self.enter(FunctionId::GetFullName) {
            return status;
        }
        match self.gpus.read().unwrap().iter().find(|g| g.handle == gpu) {
            Some(mock) => {
                write_short_string(name, &mock.name);
                NvStatus::OK
            }
            None => NvStatus::EXPECTED_PHYSICAL_GPU_HANDLE,
        }
    }

    fn board_info(&self, gpu: PhysicalGpuHandle, info: &mut BoardInfo) -> NvStatus {
        self.serve(FunctionId::GetBoardInfo, gpu, info, |g| {
            let mut info = BoardInfo::stamped();
            info.board_num = g.board_num;
            info
        })
    }

    fn all_clock_frequencies(
        &self,
        gpu: PhysicalGpuHandle,
        frequencies: &mut ClockFrequencies,
    ) -> NvStatus {
        let selector = frequencies.clock_type as usize;
        if selector > 2 {
            return NvStatus::INVALID_ARGUMENT;
        }
        self.serve(FunctionId::GetAllClockFrequencies, gpu, frequencies, |g| {
            g.clocks[selector]
        })
    }

    fn dynamic_pstates_info(
        &self,
        gpu: PhysicalGpuHandle,
        info: &mut DynamicPstates,
    ) -> NvStatus {
        self.serve(FunctionId::GetDynamicPstatesInfoEx, gpu, info, |g| {
            g.dynamic_pstates
        })
    }

    fn pstates20(&self, gpu: PhysicalGpuHandle, pstates: &mut Pstates20) -> NvStatus {
        self.serve(FunctionId::GetPstates20, gpu, pstates, |g| g.pstates20)
    }

    fn set_pstates20(&self, gpu: PhysicalGpuHandle, pstates: &mut Pstates20) -> NvStatus {
        let status = self.apply(FunctionId::SetPstates20, gpu, &*pstates, |g, staged| {
            for staged_state in staged.states() {
                let clock_count = g.pstates20.clock_count as usize;
                let Some(state) = g
                    .pstates20
                    .states
                    .iter_mut()
                    .find(|s| s.state_num == staged_state.state_num)
                else {
                    continue;
                };
                for staged_clock in staged.clocks(staged_state) {
                    if let Some(clock) = state.clocks[..clock_count.min(8)]
                        .iter_mut()
                        .find(|c| c.domain == staged_clock.domain)
                    {
                        clock.freq_delta.value = staged_clock.freq_delta.value;
                    }
                }
            }
            for staged_volt in staged.over_volts() {
                if let Some(volt) = g
                    .pstates20
                    .over_volt
                    .voltages
                    .iter_mut()
                    .find(|v| v.domain == staged_volt.domain)
                {
                    volt.volt_delta.value = staged_volt.volt_delta.value;
                }
            }
        });
        if status.is_ok() {
            *self.last_pstates20.lock().unwrap() = Some(*pstates);
        }
        status
    }

    fn power_policies_info(
        &self,
        gpu: PhysicalGpuHandle,
        info: &mut PowerPoliciesInfo,
    ) -> NvStatus {
        self.serve(FunctionId::ClientPowerPoliciesGetInfo, gpu, info, |g| {
            g.power_info
        })
    }

    fn power_policies_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut PowerPoliciesStatus,
    ) -> NvStatus {
        self.serve(FunctionId::ClientPowerPoliciesGetStatus, gpu, status, |g| {
            g.power_status
        })
    }

    fn set_power_policies_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut PowerPoliciesStatus,
    ) -> NvStatus {
        let result = self.apply(
            FunctionId::ClientPowerPoliciesSetStatus,
            gpu,
            &*status,
            |g, staged| {
                for entry in staged.entries() {
                    if let Some(current) = g
                        .power_status
                        .entries
                        .iter_mut()
                        .find(|e| e.pstate_id == entry.pstate_id)
                    {
                        current.power = entry.power;
                    }
                }
            },
        );
        if result.is_ok() {
            *self.last_power_status.lock().unwrap() = Some(*status);
        }
        result
    }

    fn voltage_domains_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut VoltageDomainsStatus,
    ) -> NvStatus {
        self.serve(FunctionId::GetVoltageDomainsStatus, gpu, status, |g| {
            g.voltage_status
        })
    }

    fn thermal_settings(
        &self,
        gpu: PhysicalGpuHandle,
        sensor_index: u32,
        settings: &mut ThermalSettings,
    ) -> NvStatus {
        if sensor_index != THERMAL_TARGET_ALL as u32 {
            return NvStatus::INVALID_ARGUMENT;
        }
        self.serve(FunctionId::GetThermalSettings, gpu, settings, |g| {
            g.thermal_settings
        })
    }

    fn thermal_policies_info(
        &self,
        gpu: PhysicalGpuHandle,
        info: &mut ThermalPoliciesInfo,
    ) -> NvStatus {
        self.serve(FunctionId::ClientThermalPoliciesGetInfo, gpu, info, |g| {
            g.thermal_info
        })
    }

    fn thermal_policies_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut ThermalPoliciesStatus,
    ) -> NvStatus {
        self.serve(FunctionId::ClientThermalPoliciesGetStatus, gpu, status, |g| {
            g.thermal_status
        })
    }

    fn set_thermal_policies_status(
        &self,
        gpu: PhysicalGpuHandle,
        status: &mut ThermalPoliciesStatus,
    ) -> NvStatus {
        let result = self.apply(
            FunctionId::ClientThermalPoliciesSetStatus,
            gpu,
            &*status,
            |g, staged| {
                for entry in staged.entries() {
                    if let Some(current) = g
                        .thermal_status
                        .entries
                        .iter_mut()
                        .find(|e| e.controller == entry.controller)
                    {
                        current.value = entry.value;
                    }
                }
            },
        );
        if result.is_ok() {
            *self.last_thermal_status.lock().unwrap() = Some(*status);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_enumerates_gpus() {
        let mock = MockNvapi::new(2);
        let mut handles = [PhysicalGpuHandle::NULL; MAX_PHYSICAL_GPUS];
        let mut count = 0;
        assert!(mock.enum_physical_gpus(&mut handles, &mut count).is_ok());
        assert_eq!(count, 2);
        assert_ne!(handles[0], handles[1]);
        assert_eq!(mock.call_count(FunctionId::EnumPhysicalGpus), 1);
    }

    #[test]
    fn test_mock_checks_version() {
        let mock = MockNvapi::new(1);
        let handle = mock.gpu(0).handle;

        let mut pstates = Pstates20::zeroed();
        assert_eq!(
            mock.pstates20(handle, &mut pstates),
            NvStatus::INCOMPATIBLE_STRUCT_VERSION
        );

        let mut pstates = Pstates20::stamped();
        assert!(mock.pstates20(handle, &mut pstates).is_ok());
        assert_eq!(pstates.state_count, 2);
        assert_eq!(pstates.version, Pstates20::expected_version());
    }

    #[test]
    fn test_mock_failure_injection() {
        let mock = MockNvapi::new(1);
        let handle = mock.gpu(0).handle;
        mock.fail_call(FunctionId::GetVoltageDomainsStatus, NvStatus::NOT_SUPPORTED);

        let mut status = VoltageDomainsStatus::stamped();
        assert_eq!(
            mock.voltage_domains_status(handle, &mut status),
            NvStatus::NOT_SUPPORTED
        );

        mock.clear_failures();
        assert!(mock.voltage_domains_status(handle, &mut status).is_ok());
        assert_eq!(mock.call_count(FunctionId::GetVoltageDomainsStatus), 2);
    }

    #[test]
    fn test_mock_unknown_handle() {
        let mock = MockNvapi::new(1);
        let mut id = 0;
        assert_eq!(
            mock.gpu_id(PhysicalGpuHandle::from_raw(0xDEAD), &mut id),
            NvStatus::EXPECTED_PHYSICAL_GPU_HANDLE
        );
    }

    #[test]
    fn test_mock_applies_pstates20() {
        let mock = MockNvapi::new(1);
        let handle = mock.gpu(0).handle;

        let mut staged = Pstates20::stamped();
        staged.state_count = 1;
        staged.clock_count = 1;
        staged.states[0].state_num = 0;
        staged.states[0].clocks[0].domain = CLOCK_DOMAIN_MEMORY;
        staged.states[0].clocks[0].freq_delta.value = 250_000;

        assert!(mock.set_pstates20(handle, &mut staged).is_ok());
        assert_eq!(
            mock.gpu(0).pstates20.states[0].clocks[1].freq_delta.value,
            250_000
        );
        assert_eq!(mock.last_pstates20(), Some(staged));
    }
}
