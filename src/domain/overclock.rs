//! Overclock domain types
//!
//! An [`OverclockProfile`] describes what can be adjusted on one GPU, and an
//! [`OverclockRequest`] carries the absolute values a caller wants applied.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Independently adjustable setting
///
/// The discriminants are part of the C interface.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OverclockArea {
    Core = 0,
    Memory = 1,
    Shader = 2,
    Overvolt = 3,
    PowerLimit = 4,
    ThermalLimit = 5,
}

impl OverclockArea {
    pub const ALL: [OverclockArea; 6] = [
        Self::Core,
        Self::Memory,
        Self::Shader,
        Self::Overvolt,
        Self::PowerLimit,
        Self::ThermalLimit,
    ];

    /// Area for a raw C discriminant
    pub fn from_raw(raw: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|area| *area as i32 == raw)
    }

    /// Unit the setting is expressed in
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Core | Self::Memory | Self::Shader => "MHz",
            Self::Overvolt => "mV",
            Self::PowerLimit => "%",
            Self::ThermalLimit => "°C",
        }
    }

    /// Whether the setting is a clock offset
    pub const fn is_clock(self) -> bool {
        matches!(self, Self::Core | Self::Memory | Self::Shader)
    }
}

impl fmt::Display for OverclockArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core => write!(f, "core clock"),
            Self::Memory => write!(f, "memory clock"),
            Self::Shader => write!(f, "shader clock"),
            Self::Overvolt => write!(f, "overvolt"),
            Self::PowerLimit => write!(f, "power limit"),
            Self::ThermalLimit => write!(f, "thermal limit"),
        }
    }
}

/// Current value and allowed range for one area
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OverclockSetting {
    pub editable: bool,
    pub current: f32,
    pub min: f32,
    pub max: f32,
}

impl OverclockSetting {
    pub const fn new(editable: bool, current: f32, min: f32, max: f32) -> Self {
        Self {
            editable,
            current,
            min,
            max,
        }
    }

    /// Whether `value` lies within `[min, max]`
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Every adjustable setting of one GPU at its best pstate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OverclockProfile {
    pub core: OverclockSetting,
    pub memory: OverclockSetting,
    pub shader: OverclockSetting,
    pub overvolt: OverclockSetting,
    pub power_limit: OverclockSetting,
    pub thermal_limit: OverclockSetting,
}

impl OverclockProfile {
    pub fn get(&self, area: OverclockArea) -> &OverclockSetting {
        match area {
            OverclockArea::Core => &self.core,
            OverclockArea::Memory => &self.memory,
            OverclockArea::Shader => &self.shader,
            OverclockArea::Overvolt => &self.overvolt,
            OverclockArea::PowerLimit => &self.power_limit,
            OverclockArea::ThermalLimit => &self.thermal_limit,
        }
    }

    pub fn get_mut(&mut self, area: OverclockArea) -> &mut OverclockSetting {
        match area {
            OverclockArea::Core => &mut self.core,
            OverclockArea::Memory => &mut self.memory,
            OverclockArea::Shader => &mut self.shader,
            OverclockArea::Overvolt => &mut self.overvolt,
            OverclockArea::PowerLimit => &mut self.power_limit,
            OverclockArea::ThermalLimit => &mut self.thermal_limit,
        }
    }

    /// Settings in area order
    pub fn iter(&self) -> impl Iterator<Item = (OverclockArea, &OverclockSetting)> {
        OverclockArea::ALL.into_iter().map(move |area| (area, self.get(area)))
    }
}

/// Desired absolute values keyed by area
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverclockRequest(BTreeMap<OverclockArea, f32>);

impl OverclockRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, area: OverclockArea, value: f32) -> Self {
        self.set(area, value);
        self
    }

    pub fn set(&mut self, area: OverclockArea, value: f32) {
        self.0.insert(area, value);
    }

    pub fn get(&self, area: OverclockArea) -> Option<f32> {
        self.0.get(&area).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OverclockArea, f32)> + '_ {
        self.0.iter().map(|(area, value)| (*area, *value))
    }
}

impl FromIterator<(OverclockArea, f32)> for OverclockRequest {
    fn from_iter<I: IntoIterator<Item = (OverclockArea, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_from_raw() {
        assert_eq!(OverclockArea::from_raw(0), Some(OverclockArea::Core));
        assert_eq!(OverclockArea::from_raw(3), Some(OverclockArea::Overvolt));
        assert_eq!(OverclockArea::from_raw(5), Some(OverclockArea::ThermalLimit));
        assert_eq!(OverclockArea::from_raw(6), None);
        assert_eq!(OverclockArea::from_raw(-1), None);
    }

    #[test]
    fn test_setting_contains_bounds() {
        let setting = OverclockSetting::new(true, 0.0, -200.0, 200.0);
        assert!(setting.contains(-200.0));
        assert!(setting.contains(200.0));
        assert!(setting.contains(50.0));
        assert!(!setting.contains(200.5));
        assert!(!setting.contains(-201.0));
    }

    #[test]
    fn test_profile_accessors() {
        let mut profile = OverclockProfile::default();
        profile.get_mut(OverclockArea::Memory).current = 500.0;
        assert_eq!(profile.memory.current, 500.0);
        assert_eq!(profile.get(OverclockArea::Memory).current, 500.0);
        assert!(!profile.get(OverclockArea::Core).editable);

        let areas: Vec<_> = profile.iter().map(|(area, _)| area).collect();
        assert_eq!(areas, OverclockArea::ALL.to_vec());
    }

    #[test]
    fn test_request_is_keyed_by_area() {
        let request = OverclockRequest::new()
            .with(OverclockArea::Core, 100.0)
            .with(OverclockArea::Core, 150.0)
            .with(OverclockArea::PowerLimit, 110.0);

        assert_eq!(request.len(), 2);
        assert_eq!(request.get(OverclockArea::Core), Some(150.0));
        assert_eq!(request.get(OverclockArea::Memory), None);
    }

    #[test]
    fn test_request_json() {
        let request: OverclockRequest =
            [(OverclockArea::Overvolt, 25.0)].into_iter().collect();
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"overvolt":25.0}"#);
    }

    #[test]
    fn test_area_display_and_unit() {
        assert_eq!(OverclockArea::PowerLimit.to_string(), "power limit");
        assert_eq!(OverclockArea::Overvolt.unit(), "mV");
        assert!(OverclockArea::Shader.is_clock());
        assert!(!OverclockArea::ThermalLimit.is_clock());
    }
}
