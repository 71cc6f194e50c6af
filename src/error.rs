//! Unified error types for nvoc
//!
//! This module defines all error types used throughout the crate.
//! Uses thiserror for ergonomic error definitions.

use crate::domain::OverclockArea;
use crate::nvapi::{FunctionId, NvStatus};

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from NVAPI operations
    #[error("NVAPI error: {0}")]
    Nvapi(#[from] NvapiError),

    /// Error from an overclock transaction
    #[error("Overclock failed: {0}")]
    Overclock(#[from] OverclockError),

    /// Error from configuration parsing/validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// GPU index out of range
    #[error("GPU not found at index {0}")]
    GpuNotFound(usize),

    /// IO error (output, file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from loading and calling NVAPI
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NvapiError {
    /// The vendor library could not be loaded
    #[error("NVAPI library not found ({0}). Is the NVIDIA driver installed?")]
    LibraryNotFound(String),

    /// The query-interface symbol is missing from the library
    #[error("NVAPI entry point not exported: {0}")]
    SymbolNotFound(String),

    /// NvAPI_Initialize returned a failure
    #[error("Failed to initialize NVAPI: {0}")]
    InitializationFailed(NvStatus),

    /// A raw call returned a failure status
    #[error("{call} failed: {status}")]
    Call { call: FunctionId, status: NvStatus },

    /// Enumeration found no physical GPUs
    #[error("No NVIDIA GPUs detected")]
    NoGpusFound,

    /// The stable GPU ID could not be resolved for a handle
    #[error("Failed to resolve GPU ID: {0}")]
    GpuIdUnavailable(NvStatus),

    /// The library has been shut down
    #[error("NVAPI is not initialized")]
    NotInitialized,
}

impl NvapiError {
    /// Status carried by the error, if any
    pub fn status(&self) -> Option<NvStatus> {
        match self {
            Self::InitializationFailed(status)
            | Self::GpuIdUnavailable(status)
            | Self::Call { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors from building or submitting an overclock transaction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverclockError {
    /// No dataset could be polled to validate against
    #[error("No GPU data available: {0}")]
    NoDataset(NvapiError),

    /// The request names no settings
    #[error("Overclock request is empty")]
    EmptyRequest,

    /// The driver reports the setting as locked
    #[error("{0} is not editable on this GPU")]
    NotEditable(OverclockArea),

    /// Requested value outside the advertised range
    #[error("{area} value {value} outside valid range {min} to {max}")]
    OutOfRange {
        area: OverclockArea,
        value: f32,
        min: f32,
        max: f32,
    },

    /// The core clock names no voltage domain to apply an overvolt to
    #[error("No voltage domain referenced by the core clock")]
    MissingVoltageDomain,

    /// The driver rejected a submitted record
    #[error("{call} rejected: {status}")]
    Rejected { call: FunctionId, status: NvStatus },
}

/// Errors from configuration parsing and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Invalid config value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nvapi_error_display() {
        let err = NvapiError::LibraryNotFound("nvapi64.dll".to_string());
        assert!(err.to_string().contains("NVIDIA driver"));

        let err = NvapiError::Call {
            call: FunctionId::GetPstates20,
            status: NvStatus::NOT_SUPPORTED,
        };
        assert!(err.to_string().contains("NvAPI_GPU_GetPstates20"));
        assert!(err.to_string().contains("NVAPI_NOT_SUPPORTED"));
    }

    #[test]
    fn test_nvapi_error_status() {
        let err = NvapiError::InitializationFailed(NvStatus::ERROR);
        assert_eq!(err.status(), Some(NvStatus::ERROR));
        assert_eq!(NvapiError::NoGpusFound.status(), None);
    }

    #[test]
    fn test_out_of_range_display() {
        let err = OverclockError::OutOfRange {
            area: OverclockArea::Core,
            value: 500.0,
            min: -200.0,
            max: 200.0,
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("-200 to 200"));
    }

    #[test]
    fn test_error_conversion() {
        let app_err: AppError = NvapiError::NoGpusFound.into();
        assert!(matches!(app_err, AppError::Nvapi(_)));

        let app_err: AppError = OverclockError::EmptyRequest.into();
        assert!(matches!(app_err, AppError::Overclock(_)));
    }
}
