//! NVAPI binding layer
//!
//! Loads the vendor library, resolves numbered entry points and exposes
//! one typed call per vendor operation.

pub mod ids;
pub mod interface;
pub mod lifecycle;
pub mod load;
pub mod resolver;
pub mod status;
pub mod types;
pub mod version;

pub use ids::FunctionId;
pub use interface::{Nvapi, NvapiCalls};
pub use lifecycle::{Lifecycle, LifecycleState, ResolverLoader};
pub use resolver::{EntryPoint, InterfaceResolver, LibraryResolver};
pub use status::NvStatus;
pub use types::PhysicalGpuHandle;
pub use version::VersionedStruct;
