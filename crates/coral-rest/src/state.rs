//! Application state for Axum handlers.

use coral_cache::{CacheBackend, Memoizer};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide cache backend, selected once at startup.
    pub cache: Arc<dyn CacheBackend>,
    /// Memoizer available to any handler or service function.
    pub memoizer: Memoizer,
}

impl AppState {
    /// Creates a new application state.
    #[must_use]
    pub fn new(cache: Arc<dyn CacheBackend>, memoizer: Memoizer) -> Self {
        Self { cache, memoizer }
    }
}
