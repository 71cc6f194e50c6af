//! Process-level NVAPI lifecycle
//!
//! `Unloaded -> Loading -> Ready`, or `Failed` when any step of loading
//! fails. Nothing from a failed attempt is kept; the next [`Lifecycle::acquire`]
//! starts over. [`Lifecycle::shutdown`] unloads and returns to `Unloaded`.

use crate::error::NvapiError;
use crate::nvapi::interface::Nvapi;
use crate::nvapi::resolver::{InterfaceResolver, LibraryResolver, DEFAULT_LIBRARY_NAMES};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Produces a resolver for each load attempt
pub type ResolverLoader =
    Box<dyn Fn() -> Result<Arc<dyn InterfaceResolver>, NvapiError> + Send + Sync>;

/// Observable lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Unloaded,
    /// An [`Lifecycle::acquire`] call is loading the library right now
    Loading,
    Ready,
    Failed(NvapiError),
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unloaded => write!(f, "unloaded"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Failed(e) => write!(f, "failed ({})", e),
        }
    }
}

enum State {
    Unloaded,
    Ready(Arc<Nvapi>),
    Failed(NvapiError),
}

/// Owner of the loaded library and its initialize/unload bracket
pub struct Lifecycle {
    loader: ResolverLoader,
    state: Mutex<State>,
    // Set while `acquire` holds the state lock for a load
    loading: AtomicBool,
}

impl Lifecycle {
    /// Lifecycle using a custom resolver loader
    pub fn new(loader: ResolverLoader) -> Self {
        Self {
            loader,
            state: Mutex::new(State::Unloaded),
            loading: AtomicBool::new(false),
        }
    }

    /// Lifecycle loading the vendor library under one of `names`
    pub fn with_library_names(names: Vec<String>) -> Self {
        Self::new(Box::new(move || {
            let resolver = LibraryResolver::load(&names)?;
            Ok(Arc::new(resolver) as Arc<dyn InterfaceResolver>)
        }))
    }

    /// Ready NVAPI, loading it first if needed
    pub fn acquire(&self) -> Result<Arc<Nvapi>, NvapiError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if let State::Ready(nvapi) = &*state {
            return Ok(Arc::clone(nvapi));
        }

        log::debug!("Loading NVAPI");
        self.loading.store(true, Ordering::SeqCst);
        let result = match (self.loader)().and_then(Nvapi::initialize) {
            Ok(nvapi) => {
                let nvapi = Arc::new(nvapi);
                *state = State::Ready(Arc::clone(&nvapi));
                Ok(nvapi)
            }
            Err(e) => {
                log::debug!("NVAPI load failed: {}", e);
                *state = State::Failed(e.clone());
                Err(e)
            }
        };
        self.loading.store(false, Ordering::SeqCst);
        result
    }

    /// Unload NVAPI if it is loaded; returns whether anything was unloaded
    pub fn shutdown(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match std::mem::replace(&mut *state, State::Unloaded) {
            State::Ready(nvapi) => {
                nvapi.unload();
                true
            }
            _ => false,
        }
    }

    /// Current state; does not wait for a load in progress
    pub fn state(&self) -> LifecycleState {
        if self.loading.load(Ordering::SeqCst) {
            return LifecycleState::Loading;
        }
        match &*self.state.lock().unwrap_or_else(|e| e.into_inner()) {
            State::Unloaded => LifecycleState::Unloaded,
            State::Ready(_) => LifecycleState::Ready,
            State::Failed(e) => LifecycleState::Failed(e.clone()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::with_library_names(DEFAULT_LIBRARY_NAMES.iter().map(|s| s.to_string()).collect())
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
