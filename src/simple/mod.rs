//! Simplified polling interface
//!
//! [`PollingContext`] is the explicit, rate-limited context; [`ffi`] exposes
//! it as flat `extern "C"` functions over a single process-wide instance.

pub mod context;
pub mod ffi;

pub use context::{ApiFactory, PollingContext};
