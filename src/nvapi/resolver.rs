//! Entry-point resolution
//!
//! NVAPI exports one symbol, `nvapi_QueryInterface`, which maps a numeric ID
//! to a function pointer. [`InterfaceResolver`] abstracts that lookup so the
//! raw call layer can be driven by a fake table in tests.

use crate::error::NvapiError;

use libloading::{Library, Symbol};
use std::ffi::c_void;
use std::ptr::NonNull;

/// Untyped function pointer handed out by the query interface
pub type EntryPoint = NonNull<c_void>;

/// Name of the single exported NVAPI symbol
pub const QUERY_INTERFACE_SYMBOL: &str = "nvapi_QueryInterface";

/// Default library file names for this target
#[cfg(target_pointer_width = "64")]
pub const DEFAULT_LIBRARY_NAMES: &[&str] = &["nvapi64.dll"];

#[cfg(not(target_pointer_width = "64"))]
pub const DEFAULT_LIBRARY_NAMES: &[&str] = &["nvapi.dll"];

/// Resolves numbered entry points
pub trait InterfaceResolver: Send + Sync {
    /// Look up the function registered under `id`
    fn resolve(&self, id: u32) -> Option<EntryPoint>;
}

type QueryInterfaceFn = unsafe extern "C" fn(id: u32) -> *mut c_void;

/// Resolver backed by the dynamically loaded vendor library
pub struct LibraryResolver {
    query: QueryInterfaceFn,
    // Keeps `query` valid; dropped last
    _library: Library,
}

impl LibraryResolver {
    /// Load the library under the first name that opens and resolve the query interface
    pub fn load<S: AsRef<str>>(names: &[S]) -> Result<Self, NvapiError> {
        let library = Self::load_library(names)?;

        // SAFETY: the symbol has this signature in every NVAPI release
        let query = unsafe {
            let symbol: Symbol<QueryInterfaceFn> = library
                .get(QUERY_INTERFACE_SYMBOL.as_bytes())
                .map_err(|e| {
                    log::debug!("{} lookup failed: {}", QUERY_INTERFACE_SYMBOL, e);
                    NvapiError::SymbolNotFound(QUERY_INTERFACE_SYMBOL.to_string())
                })?;
            *symbol
        };

        Ok(Self {
            query,
            _library: library,
        })
    }

    /// Load using [`DEFAULT_LIBRARY_NAMES`]
    pub fn load_default() -> Result<Self, NvapiError> {
        Self::load(DEFAULT_LIBRARY_NAMES)
    }

    fn load_library<S: AsRef<str>>(names: &[S]) -> Result<Library, NvapiError> {
        let mut last_err = String::from("no library names configured");

        for name in names {
            let name = name.as_ref();
            // SAFETY: loading the vendor library runs its initializers, which
            // is the documented way to use NVAPI
            match unsafe { Library::new(name) } {
                Ok(library) => {
                    log::info!("Loaded NVAPI from {}", name);
                    return Ok(library);
                }
                Err(e) => {
                    log::debug!("Failed to load {}: {}", name, e);
                    last_err = format!("{}: {}", name, e);
                }
            }
        }

        Err(NvapiError::LibraryNotFound(last_err))
    }
}

impl InterfaceResolver for LibraryResolver {
    fn resolve(&self, id: u32) -> Option<EntryPoint> {
        // SAFETY: the query interface is a pure table lookup
        NonNull::new(unsafe { (self.query)(id) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_reports_not_found() {
        let result = LibraryResolver::load(&["definitely-not-a-real-nvapi.dll"]);
        assert!(matches!(result, Err(NvapiError::LibraryNotFound(_))));
    }

    #[test]
    fn test_empty_name_list() {
        let names: [&str; 0] = [];
        match LibraryResolver::load(&names) {
            Err(NvapiError::LibraryNotFound(msg)) => assert!(msg.contains("no library")),
            _ => panic!("expected LibraryNotFound"),
        }
    }

    #[test]
    #[ignore = "Requires NVIDIA driver"]
    fn test_load_default() {
        assert!(LibraryResolver::load_default().is_ok());
    }
}
