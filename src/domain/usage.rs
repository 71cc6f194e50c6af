//! Utilization readings

use super::clocks::UNAVAILABLE;
use serde::{Deserialize, Serialize};

/// Utilization in percent per GPU subsystem; `-1` when not reported
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpuUsage {
    pub core: f32,
    pub frame_buffer: f32,
    pub video: f32,
    pub bus: f32,
}

impl GpuUsage {
    pub const fn unavailable() -> Self {
        Self {
            core: UNAVAILABLE,
            frame_buffer: UNAVAILABLE,
            video: UNAVAILABLE,
            bus: UNAVAILABLE,
        }
    }
}

impl Default for GpuUsage {
    fn default() -> Self {
        Self::unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unavailable() {
        let usage = GpuUsage::default();
        assert_eq!(usage.core, -1.0);
        assert_eq!(usage.frame_buffer, -1.0);
        assert_eq!(usage.video, -1.0);
        assert_eq!(usage.bus, -1.0);
    }
}
