//! Clock domain types
//!
//! Frequencies are reported in MHz; `-1` marks a domain the GPU does not
//! report.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value reported for a clock or usage reading that is not available
pub const UNAVAILABLE: f32 = -1.0;

/// Which clock-frequency table to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockFrequencyType {
    /// What the GPU is running at right now
    #[default]
    Current,
    /// Factory base clocks
    Base,
    /// Factory boost clocks
    Boost,
}

impl ClockFrequencyType {
    pub const ALL: [ClockFrequencyType; 3] = [Self::Current, Self::Base, Self::Boost];

    /// Selector value written into the clock-frequency record
    pub const fn selector(self) -> u32 {
        match self {
            Self::Current => 0,
            Self::Base => 1,
            Self::Boost => 2,
        }
    }
}

impl fmt::Display for ClockFrequencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Base => write!(f, "base"),
            Self::Boost => write!(f, "boost"),
        }
    }
}

/// Core, memory and shader clocks in MHz
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpuClocks {
    pub core: f32,
    pub memory: f32,
    pub shader: f32,
}

impl GpuClocks {
    pub const fn new(core: f32, memory: f32, shader: f32) -> Self {
        Self {
            core,
            memory,
            shader,
        }
    }

    /// Every domain marked unavailable
    pub const fn unavailable() -> Self {
        Self::new(UNAVAILABLE, UNAVAILABLE, UNAVAILABLE)
    }
}

impl Default for GpuClocks {
    fn default() -> Self {
        Self::unavailable()
    }
}

fn fmt_mhz(f: &mut fmt::Formatter<'_>, value: f32) -> fmt::Result {
    if value < 0.0 {
        write!(f, "N/A")
    } else {
        write!(f, "{:.0} MHz", value)
    }
}

impl fmt::Display for GpuClocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "core ")?;
        fmt_mhz(f, self.core)?;
        write!(f, ", memory ")?;
        fmt_mhz(f, self.memory)?;
        write!(f, ", shader ")?;
        fmt_mhz(f, self.shader)
    }
}
