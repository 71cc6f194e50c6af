//! Domain models for nvoc
//!
//! Value types handed to callers. The `#[repr(C)]` ones also cross the C
//! interface unchanged.

pub mod clocks;
pub mod overclock;
pub mod usage;

pub use clocks::{ClockFrequencyType, GpuClocks, UNAVAILABLE};
pub use overclock::{OverclockArea, OverclockProfile, OverclockRequest, OverclockSetting};
pub use usage::GpuUsage;
