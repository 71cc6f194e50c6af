//! NVAPI status codes
//!
//! Every raw entry point returns a signed 32-bit status. Zero is success and
//! everything else is a vendor-specific negative code. Codes are passed
//! through untouched; only a handful get a readable name.

use std::fmt;

/// Raw status code returned by an NVAPI entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NvStatus(i32);

impl NvStatus {
    pub const OK: Self = Self(0);
    pub const ERROR: Self = Self(-1);
    pub const LIBRARY_NOT_FOUND: Self = Self(-2);
    pub const NO_IMPLEMENTATION: Self = Self(-3);
    pub const API_NOT_INITIALIZED: Self = Self(-4);
    pub const INVALID_ARGUMENT: Self = Self(-5);
    pub const NVIDIA_DEVICE_NOT_FOUND: Self = Self(-6);
    pub const END_ENUMERATION: Self = Self(-7);
    pub const INVALID_HANDLE: Self = Self(-8);
    pub const INCOMPATIBLE_STRUCT_VERSION: Self = Self(-9);
    pub const HANDLE_INVALIDATED: Self = Self(-10);
    pub const INVALID_POINTER: Self = Self(-14);
    pub const EXPECTED_PHYSICAL_GPU_HANDLE: Self = Self(-101);
    pub const NOT_SUPPORTED: Self = Self(-104);
    pub const INVALID_PERF_LEVEL: Self = Self(-107);
    pub const DEVICE_BUSY: Self = Self(-108);
    pub const INVALID_USER_PRIVILEGE: Self = Self(-137);
    pub const SET_NOT_ALLOWED: Self = Self(-158);
    pub const INSUFFICIENT_BUFFER: Self = Self(-174);
    pub const ACCESS_DENIED: Self = Self(-175);

    /// Wrap a raw code
    pub const fn from_raw(code: i32) -> Self {
        Self(code)
    }

    /// The raw code
    pub const fn raw(self) -> i32 {
        self.0
    }

    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Convert into a `Result`, keeping the failing status
    pub fn ok(self) -> Result<(), NvStatus> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Symbolic name for the well-known codes
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "NVAPI_OK",
            -1 => "NVAPI_ERROR",
            -2 => "NVAPI_LIBRARY_NOT_FOUND",
            -3 => "NVAPI_NO_IMPLEMENTATION",
            -4 => "NVAPI_API_NOT_INITIALIZED",
            -5 => "NVAPI_INVALID_ARGUMENT",
            -6 => "NVAPI_NVIDIA_DEVICE_NOT_FOUND",
            -7 => "NVAPI_END_ENUMERATION",
            -8 => "NVAPI_INVALID_HANDLE",
            -9 => "NVAPI_INCOMPATIBLE_STRUCT_VERSION",
            -10 => "NVAPI_HANDLE_INVALIDATED",
            -14 => "NVAPI_INVALID_POINTER",
            -101 => "NVAPI_EXPECTED_PHYSICAL_GPU_HANDLE",
            -104 => "NVAPI_NOT_SUPPORTED",
            -107 => "NVAPI_INVALID_PERF_LEVEL",
            -108 => "NVAPI_DEVICE_BUSY",
            -137 => "NVAPI_INVALID_USER_PRIVILEGE",
            -158 => "NVAPI_SET_NOT_ALLOWED",
            -174 => "NVAPI_INSUFFICIENT_BUFFER",
            -175 => "NVAPI_ACCESS_DENIED",
            _ => return None,
        };
        Some(name)
    }
}

impl From<i32> for NvStatus {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl fmt::Display for NvStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "NVAPI status {}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_status() {
        assert!(NvStatus::OK.is_ok());
        assert!(NvStatus::OK.ok().is_ok());
        assert_eq!(NvStatus::from(0), NvStatus::OK);
    }

    #[test]
    fn test_failure_is_passed_through() {
        let status = NvStatus::from_raw(-9);
        assert!(!status.is_ok());
        assert_eq!(status.ok(), Err(NvStatus::INCOMPATIBLE_STRUCT_VERSION));
        assert_eq!(status.raw(), -9);
    }

    #[test]
    fn test_display() {
        assert_eq!(NvStatus::NOT_SUPPORTED.to_string(), "NVAPI_NOT_SUPPORTED (-104)");
        assert_eq!(NvStatus::from_raw(-999).to_string(), "NVAPI status -999");
    }
}
