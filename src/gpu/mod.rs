//! GPU objects built on the raw call layer
//!
//! The registry enumerates devices, each [`Gpu`] caches its last polled
//! [`Dataset`], metrics are derived from that dataset and overclocks are
//! validated against it.

pub mod dataset;
pub mod device;
pub mod metrics;
pub mod overclock;
pub mod registry;

pub use dataset::Dataset;
pub use device::Gpu;
pub use overclock::{OverclockPlan, StagedChange};
pub use registry::GpuRegistry;
