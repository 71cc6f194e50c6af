//! Derived metrics
//!
//! Pure functions turning a [`Dataset`] into caller-facing values.
//!
//! Raw units: clock deltas in kHz (shown as MHz), voltages in µV (shown as
//! mV), power in thousandths of a percent of rated board power, thermal
//! limits in 1/256 °C.

use super::dataset::Dataset;
use crate::domain::{
    ClockFrequencyType, GpuClocks, GpuUsage, OverclockArea, OverclockProfile, OverclockSetting,
    UNAVAILABLE,
};
use crate::nvapi::types::{
    DeltaEntry, Pstates20, Pstates20State, CLOCK_DOMAIN_GRAPHICS, CLOCK_DOMAIN_MEMORY,
    CLOCK_DOMAIN_PROCESSOR, CLOCK_TYPE_DYNAMIC, THERMAL_CONTROLLER_GPU_INTERNAL,
    THERMAL_TARGET_GPU, UTILIZATION_BUS_INTERFACE, UTILIZATION_FRAME_BUFFER, UTILIZATION_GPU,
    UTILIZATION_VIDEO_ENGINE,
};

/// Raw units per displayed unit for clocks, voltages and power
pub const MILLI_SCALE: f32 = 1000.0;

/// Raw units per degree for thermal limits (24.8 fixed point)
pub const THERMAL_SCALE: f32 = 256.0;

/// Clock domain an overclock area adjusts
pub fn clock_domain(area: OverclockArea) -> Option<u32> {
    match area {
        OverclockArea::Core => Some(CLOCK_DOMAIN_GRAPHICS),
        OverclockArea::Memory => Some(CLOCK_DOMAIN_MEMORY),
        OverclockArea::Shader => Some(CLOCK_DOMAIN_PROCESSOR),
        _ => None,
    }
}

fn clock_area(domain: u32) -> Option<OverclockArea> {
    match domain {
        CLOCK_DOMAIN_GRAPHICS => Some(OverclockArea::Core),
        CLOCK_DOMAIN_MEMORY => Some(OverclockArea::Memory),
        CLOCK_DOMAIN_PROCESSOR => Some(OverclockArea::Shader),
        _ => None,
    }
}

/// The state with the lowest state number; the first one wins a tie
pub fn best_pstate(pstates: &Pstates20) -> Option<&Pstates20State> {
    pstates.states().iter().min_by_key(|state| state.state_num)
}

/// Voltage domain named by the best pstate's dynamic core clock
pub fn core_voltage_domain(pstates: &Pstates20) -> Option<u32> {
    let state = best_pstate(pstates)?;
    pstates
        .clocks(state)
        .iter()
        .filter(|clock| clock.domain == CLOCK_DOMAIN_GRAPHICS && clock.clock_type == CLOCK_TYPE_DYNAMIC)
        .map(|clock| clock.voltage_domain)
        .last()
}

fn delta_setting(delta: &DeltaEntry, editable: bool) -> OverclockSetting {
    OverclockSetting::new(
        editable,
        delta.value as f32 / MILLI_SCALE,
        delta.min as f32 / MILLI_SCALE,
        delta.max as f32 / MILLI_SCALE,
    )
}

/// Adjustable settings at the best pstate
pub fn overclock_profile(dataset: &Dataset) -> OverclockProfile {
    let mut profile = OverclockProfile::default();
    let pstates = &dataset.pstates20;

    let Some(state) = best_pstate(pstates) else {
        profile.thermal_limit = thermal_limit(dataset);
        return profile;
    };
    let editable = state.flags & 1 != 0;

    for clock in pstates.clocks(state) {
        if let Some(area) = clock_area(clock.domain) {
            *profile.get_mut(area) = delta_setting(&clock.freq_delta, editable);
        }
    }

    // Like the core domain lookup, the last matching entry wins
    if let Some(domain) = core_voltage_domain(pstates) {
        if let Some(volt) = pstates.over_volts().iter().rev().find(|v| v.domain == domain) {
            profile.overvolt = delta_setting(&volt.volt_delta, volt.flags & 1 != 0);
        }
    }

    profile.power_limit = power_limit(dataset, state.state_num);
    profile.thermal_limit = thermal_limit(dataset);
    profile
}

fn power_limit(dataset: &Dataset, state_num: u32) -> OverclockSetting {
    let info = dataset
        .power_info
        .entries()
        .iter()
        .find(|entry| entry.pstate_id == state_num);
    let status = dataset
        .power_status
        .entries()
        .iter()
        .find(|entry| entry.pstate_id == state_num);

    match (info, status) {
        (Some(info), Some(status)) => OverclockSetting::new(
            dataset.power_info.valid & 1 != 0,
            status.power as f32 / MILLI_SCALE,
            info.min_power as f32 / MILLI_SCALE,
            info.max_power as f32 / MILLI_SCALE,
        ),
        _ => OverclockSetting::default(),
    }
}

fn thermal_limit(dataset: &Dataset) -> OverclockSetting {
    let info = dataset
        .thermal_info
        .entries()
        .iter()
        .find(|entry| entry.controller == THERMAL_CONTROLLER_GPU_INTERNAL);
    let status = dataset
        .thermal_status
        .entries()
        .iter()
        .find(|entry| entry.controller == THERMAL_CONTROLLER_GPU_INTERNAL);

    match (info, status) {
        (Some(info), Some(status)) => OverclockSetting::new(
            dataset.thermal_info.flags & 1 != 0,
            status.value as f32 / THERMAL_SCALE,
            info.min_temp as f32 / THERMAL_SCALE,
            info.max_temp as f32 / THERMAL_SCALE,
        ),
        _ => OverclockSetting::default(),
    }
}

/// Clocks from one frequency table in MHz
///
/// With `compensate`, the active overclock offset of each domain is added,
/// since the base and boost tables report factory values.
pub fn clocks(dataset: &Dataset, kind: ClockFrequencyType, compensate: bool) -> GpuClocks {
    let table = dataset.frequencies(kind);
    let profile = compensate.then(|| overclock_profile(dataset));

    let read = |area: OverclockArea| {
        let Some(domain) = clock_domain(area) else {
            return UNAVAILABLE;
        };
        let entry = &table.entries[domain as usize];
        if entry.present & 1 == 0 {
            return UNAVAILABLE;
        }
        let offset = profile.map_or(0.0, |p| p.get(area).current);
        entry.freq as f32 / MILLI_SCALE + offset
    };

    GpuClocks::new(
        read(OverclockArea::Core),
        read(OverclockArea::Memory),
        read(OverclockArea::Shader),
    )
}

/// Utilization per subsystem in percent
pub fn usage(dataset: &Dataset) -> GpuUsage {
    let read = |index: usize| {
        let entry = &dataset.dynamic_pstates.utilization[index];
        if entry.present & 1 == 0 {
            UNAVAILABLE
        } else {
            entry.value as f32
        }
    };

    GpuUsage {
        core: read(UTILIZATION_GPU),
        frame_buffer: read(UTILIZATION_FRAME_BUFFER),
        video: read(UTILIZATION_VIDEO_ENGINE),
        bus: read(UTILIZATION_BUS_INTERFACE),
    }
}

/// Core voltage in mV
pub fn voltage(dataset: &Dataset) -> f32 {
    dataset
        .voltage_status
        .entries()
        .iter()
        .find(|entry| entry.voltage_domain == 0)
        .map_or(UNAVAILABLE, |entry| entry.current_voltage as f32 / MILLI_SCALE)
}

/// GPU temperature in °C
pub fn temperature(dataset: &Dataset) -> f32 {
    dataset
        .thermal_settings
        .sensors()
        .iter()
        .find(|sensor| sensor.target & THERMAL_TARGET_GPU != 0)
        .map_or(UNAVAILABLE, |sensor| sensor.current_temp as f32)
}

/// Render raw board bytes as uppercase hex
pub fn serial_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}
