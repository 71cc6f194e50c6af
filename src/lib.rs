//! nvoc - NVAPI-based GPU overclocking library
//!
//! This library loads NVIDIA's NVAPI at runtime, polls per-GPU datasets,
//! derives clocks, utilization and overclock ranges from them and applies
//! overclocks as validated transactions.
//!
//! # Modules
//!
//! - [`api`]: Object-style entry point
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers
//! - [`config`]: Configuration system
//! - [`domain`]: Value types shared by every layer
//! - [`error`]: Error types
//! - [`gpu`]: GPU registry, datasets, metrics and overclock plans
//! - [`nvapi`]: NVAPI loading and raw call layer
//! - [`simple`]: Rate-limited polling context and flat C interface

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod gpu;
pub mod nvapi;
pub mod simple;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use api::NvApi;
pub use error::{AppError, Result};
