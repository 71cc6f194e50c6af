//! Fixed-layout NVAPI records
//!
//! Layouts mirror the driver's private structs. Field meaning beyond what is
//! named here is unknown; such fields are kept as padding so sizes match.

use crate::nvapi::version::versioned_struct;

use std::ffi::c_void;
use std::os::raw::c_char;

/// Length of an NVAPI short string buffer, terminator included
pub const SHORT_STRING_SIZE: usize = 64;

/// Upper bound on physical GPU handles returned by enumeration
pub const MAX_PHYSICAL_GPUS: usize = 64;

/// NVAPI short string buffer
pub type ShortString = [c_char; SHORT_STRING_SIZE];

/// Decode a NUL-terminated short string, replacing invalid UTF-8
pub fn read_short_string(buffer: &ShortString) -> String {
    let bytes: Vec<u8> = buffer
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Encode `value` into a short string, truncating to leave room for the NUL
pub fn write_short_string(buffer: &mut ShortString, value: &str) {
    let len = value.len().min(SHORT_STRING_SIZE - 1);
    for (dst, src) in buffer.iter_mut().zip(&value.as_bytes()[..len]) {
        *dst = *src as c_char;
    }
    buffer[len] = 0;
}

/// Opaque driver-issued token for one physical GPU
///
/// Never dereferenced on this side of the boundary.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicalGpuHandle(*mut c_void);

// SAFETY: the handle is an opaque key the driver hands out; it is only ever
// passed back to the driver, which is safe to call from any thread.
unsafe impl Send for PhysicalGpuHandle {}
unsafe impl Sync for PhysicalGpuHandle {}

impl PhysicalGpuHandle {
    pub const NULL: Self = Self(std::ptr::null_mut());

    /// Build a handle from a raw token value
    pub fn from_raw(token: usize) -> Self {
        Self(token as *mut c_void)
    }

    /// Raw token value
    pub fn as_raw(&self) -> usize {
        self.0 as usize
    }
}

impl Default for PhysicalGpuHandle {
    fn default() -> Self {
        Self::NULL
    }
}

// Clock domains, used both as `ClockFrequencies::entries` indices and as
// `Pstates20ClockEntry::domain` values.
pub const CLOCK_DOMAIN_GRAPHICS: u32 = 0;
pub const CLOCK_DOMAIN_MEMORY: u32 = 4;
pub const CLOCK_DOMAIN_PROCESSOR: u32 = 7;

/// `Pstates20ClockEntry::clock_type` for a dynamic clock that names a voltage rail
pub const CLOCK_TYPE_DYNAMIC: u32 = 1;

// `DynamicPstates::utilization` indices
pub const UTILIZATION_GPU: usize = 0;
pub const UTILIZATION_FRAME_BUFFER: usize = 1;
pub const UTILIZATION_VIDEO_ENGINE: usize = 2;
pub const UTILIZATION_BUS_INTERFACE: usize = 3;

// Thermal controllers
pub const THERMAL_CONTROLLER_NONE: i32 = 0;
pub const THERMAL_CONTROLLER_GPU_INTERNAL: i32 = 1;

// Thermal target bits
pub const THERMAL_TARGET_NONE: i32 = 0;
pub const THERMAL_TARGET_GPU: i32 = 1;
pub const THERMAL_TARGET_MEMORY: i32 = 2;
pub const THERMAL_TARGET_POWER_SUPPLY: i32 = 4;
pub const THERMAL_TARGET_BOARD: i32 = 8;
pub const THERMAL_TARGET_ALL: i32 = 15;

/// `(current, min, max)` adjustable offset
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeltaEntry {
    pub value: i32,
    pub min: i32,
    pub max: i32,
}

impl DeltaEntry {
    pub const fn new(value: i32, min: i32, max: i32) -> Self {
        Self { value, min, max }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pstates20ClockEntry {
    pub domain: u32,
    /// 0 for a single-frequency clock, 1 for a dynamic one
    pub clock_type: u32,
    pub flags: u32,
    pub freq_delta: DeltaEntry,
    pub min_or_single_freq: u32,
    pub max_freq: u32,
    pub voltage_domain: u32,
    pub min_volt: u32,
    pub max_volt: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pstates20VoltageEntry {
    pub domain: u32,
    /// Bit 0 set when the delta is editable
    pub flags: u32,
    pub voltage: u32,
    pub volt_delta: DeltaEntry,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pstates20State {
    pub state_num: u32,
    /// Bit 0 set when the clock deltas are editable
    pub flags: u32,
    pub clocks: [Pstates20ClockEntry; 8],
    pub base_voltages: [Pstates20VoltageEntry; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pstates20OverVolt {
    pub voltage_count: u32,
    pub voltages: [Pstates20VoltageEntry; 4],
}

/// Performance-state table with clock and voltage deltas
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pstates20 {
    pub version: u32,
    pub flags: u32,
    pub state_count: u32,
    pub clock_count: u32,
    pub voltage_count: u32,
    pub states: [Pstates20State; 16],
    pub over_volt: Pstates20OverVolt,
}

versioned_struct!(Pstates20, 2);

impl Pstates20 {
    /// Reported states, clamped to the array bound
    pub fn states(&self) -> &[Pstates20State] {
        let count = (self.state_count as usize).min(self.states.len());
        &self.states[..count]
    }

    /// Reported clocks of a state, clamped to the array bound
    pub fn clocks<'a>(&self, state: &'a Pstates20State) -> &'a [Pstates20ClockEntry] {
        let count = (self.clock_count as usize).min(state.clocks.len());
        &state.clocks[..count]
    }

    /// Reported over-volt entries, clamped to the array bound
    pub fn over_volts(&self) -> &[Pstates20VoltageEntry] {
        let count = (self.over_volt.voltage_count as usize).min(self.over_volt.voltages.len());
        &self.over_volt.voltages[..count]
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockFrequencyEntry {
    /// Bit 0 set when `freq` is valid
    pub present: u32,
    /// Frequency in kHz
    pub freq: u32,
}

/// Clock frequencies for every clock domain, indexed by domain
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockFrequencies {
    pub version: u32,
    /// Selector: 0 current, 1 base, 2 boost
    pub clock_type: u32,
    pub entries: [ClockFrequencyEntry; 32],
}

versioned_struct!(ClockFrequencies, 2);

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UtilizationEntry {
    /// Bit 0 set when `value` is valid
    pub present: u32,
    /// Utilization in percent
    pub value: u32,
}

/// Utilization of the GPU subsystems
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicPstates {
    pub version: u32,
    pub flags: u32,
    pub utilization: [UtilizationEntry; 8],
}

versioned_struct!(DynamicPstates, 1);

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerPolicyInfoEntry {
    pub pstate_id: u32,
    pub reserved: [u32; 2],
    pub min_power: u32,
    pub reserved2: [u32; 2],
    pub default_power: u32,
    pub reserved3: [u32; 2],
    pub max_power: u32,
    pub reserved4: u32,
}

/// Power policy limits
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerPoliciesInfo {
    pub version: u32,
    /// Bit 0 set when the power limit is adjustable
    pub valid: u8,
    pub count: u8,
    pub padding: [u8; 2],
    pub entries: [PowerPolicyInfoEntry; 4],
}

versioned_struct!(PowerPoliciesInfo, 1);

impl PowerPoliciesInfo {
    pub fn entries(&self) -> &[PowerPolicyInfoEntry] {
        let count = (self.count as usize).min(self.entries.len());
        &self.entries[..count]
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerPolicyStatusEntry {
    pub pstate_id: u32,
    pub reserved: u32,
    /// Current limit, in thousandths of the rated board power percentage
    pub power: u32,
    pub reserved2: u32,
}

/// Current power policy limits
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerPoliciesStatus {
    pub version: u32,
    pub count: u32,
    pub entries: [PowerPolicyStatusEntry; 4],
}

versioned_struct!(PowerPoliciesStatus, 1);

impl PowerPoliciesStatus {
    pub fn entries(&self) -> &[PowerPolicyStatusEntry] {
        let count = (self.count as usize).min(self.entries.len());
        &self.entries[..count]
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoltageDomainEntry {
    pub voltage_domain: u32,
    /// Current voltage in microvolts
    pub current_voltage: u32,
}

/// Current voltage per voltage domain
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoltageDomainsStatus {
    pub version: u32,
    pub flags: u32,
    pub count: u32,
    pub entries: [VoltageDomainEntry; 16],
}

versioned_struct!(VoltageDomainsStatus, 1);

impl VoltageDomainsStatus {
    pub fn entries(&self) -> &[VoltageDomainEntry] {
        let count = (self.count as usize).min(self.entries.len());
        &self.entries[..count]
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThermalSensor {
    pub controller: i32,
    pub default_min_temp: i32,
    pub default_max_temp: i32,
    /// Whole degrees Celsius
    pub current_temp: i32,
    /// Bitmask of `THERMAL_TARGET_*`
    pub target: i32,
}

/// Thermal sensor readings
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThermalSettings {
    pub version: u32,
    pub count: u32,
    pub sensors: [ThermalSensor; 3],
}

versioned_struct!(ThermalSettings, 2);

impl ThermalSettings {
    pub fn sensors(&self) -> &[ThermalSensor] {
        let count = (self.count as usize).min(self.sensors.len());
        &self.sensors[..count]
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThermalPolicyInfoEntry {
    pub controller: i32,
    pub reserved: u32,
    /// Degrees Celsius in 24.8 fixed point
    pub min_temp: i32,
    pub default_temp: i32,
    pub max_temp: i32,
    pub default_flags: u32,
}

/// Thermal limit policies
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThermalPoliciesInfo {
    pub version: u32,
    pub count: u8,
    /// Bit 0 set when the thermal limit is adjustable
    pub flags: u8,
    pub padding: [u8; 2],
    pub entries: [ThermalPolicyInfoEntry; 4],
}

versioned_struct!(ThermalPoliciesInfo, 2);

impl ThermalPoliciesInfo {
    pub fn entries(&self) -> &[ThermalPolicyInfoEntry] {
        let count = (self.count as usize).min(self.entries.len());
        &self.entries[..count]
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThermalPolicyStatusEntry {
    pub controller: i32,
    /// Degrees Celsius in 24.8 fixed point
    pub value: i32,
    pub flags: u32,
}

/// Current thermal limits
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThermalPoliciesStatus {
    pub version: u32,
    pub count: u32,
    pub entries: [ThermalPolicyStatusEntry; 4],
}

versioned_struct!(ThermalPoliciesStatus, 2);

impl ThermalPoliciesStatus {
    pub fn entries(&self) -> &[ThermalPolicyStatusEntry] {
        let count = (self.count as usize).min(self.entries.len());
        &self.entries[..count]
    }
}

/// Board information; carries the serial number bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardInfo {
    pub version: u32,
    pub board_num: [u8; 16],
}

versioned_struct!(BoardInfo, 1);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nvapi::version::VersionedStruct;
    use std::mem::size_of;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(size_of::<DeltaEntry>(), 12);
        assert_eq!(size_of::<Pstates20ClockEntry>(), 44);
        assert_eq!(size_of::<Pstates20VoltageEntry>(), 24);
        assert_eq!(size_of::<Pstates20State>(), 8 + 8 * 44 + 4 * 24);
        assert_eq!(size_of::<Pstates20>(), 20 + 16 * 456 + 4 + 4 * 24);
        assert_eq!(size_of::<ClockFrequencies>(), 8 + 32 * 8);
        assert_eq!(size_of::<DynamicPstates>(), 8 + 8 * 8);
        assert_eq!(size_of::<PowerPoliciesInfo>(), 8 + 4 * 44);
        assert_eq!(size_of::<PowerPoliciesStatus>(), 8 + 4 * 16);
        assert_eq!(size_of::<VoltageDomainsStatus>(), 12 + 16 * 8);
        assert_eq!(size_of::<ThermalSettings>(), 8 + 3 * 20);
        assert_eq!(size_of::<ThermalPoliciesInfo>(), 8 + 4 * 24);
        assert_eq!(size_of::<ThermalPoliciesStatus>(), 8 + 4 * 12);
        assert_eq!(size_of::<BoardInfo>(), 20);
    }

    #[test]
    fn test_handle_is_pointer_sized() {
        assert_eq!(size_of::<PhysicalGpuHandle>(), size_of::<usize>());
        assert_eq!(PhysicalGpuHandle::from_raw(0x1000).as_raw(), 0x1000);
        assert_eq!(PhysicalGpuHandle::default(), PhysicalGpuHandle::NULL);
    }

    #[test]
    fn test_short_string_round_trip() {
        let mut buffer: ShortString = [0; SHORT_STRING_SIZE];
        write_short_string(&mut buffer, "NVIDIA GeForce RTX 3080");
        assert_eq!(read_short_string(&buffer), "NVIDIA GeForce RTX 3080");

        let long = "x".repeat(100);
        write_short_string(&mut buffer, &long);
        assert_eq!(read_short_string(&buffer).len(), SHORT_STRING_SIZE - 1);
    }

    #[test]
    fn test_accessors_clamp_counts() {
        let mut pstates = Pstates20::stamped();
        pstates.state_count = 99;
        pstates.clock_count = 99;
        pstates.over_volt.voltage_count = 99;
        assert_eq!(pstates.states().len(), 16);
        assert_eq!(pstates.clocks(&pstates.states[0]).len(), 8);
        assert_eq!(pstates.over_volts().len(), 4);

        let mut thermal = ThermalSettings::stamped();
        thermal.count = 2;
        assert_eq!(thermal.sensors().len(), 2);
    }
}
