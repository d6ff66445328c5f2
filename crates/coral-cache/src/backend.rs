//! Cache backend trait for abstracted caching operations.

use async_trait::async_trait;
use serde_json::Value;
use shaku::Interface;
use std::time::Duration;
use tracing::debug;

/// The concrete storage behind a [`CacheBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Process-local in-memory store.
    Memory,
    /// Shared Redis store.
    Redis,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Redis => write!(f, "redis"),
        }
    }
}

/// Cache backend contract.
///
/// Implementations are interchangeable and selected once at process
/// startup. Failures never cross this boundary: an unreachable backend
/// degrades `get` to a miss and `set`/`delete` to no-ops, so callers must
/// never depend on the cache being available for correctness.
///
/// Values are type-erased as [`serde_json::Value`]. Empty values (`null`,
/// `false`, `0`, `""`, `[]`, `{}`) are never stored; a computation that
/// legitimately produces one of these is re-run on every call. This
/// matches the Redis backend's historical behavior and is kept so both
/// backends stay observably identical (see DESIGN.md).
#[async_trait]
pub trait CacheBackend: Interface + Send + Sync {
    /// Returns the stored value if present and unexpired.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Stores a value, overwriting any existing entry for the key.
    ///
    /// With `ttl`, the entry expires that long after the call; without,
    /// it lives until explicit deletion or backend restart.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>);

    /// Removes the entry if present.
    async fn delete(&self, key: &str);

    /// Which storage this backend uses.
    fn kind(&self) -> BackendKind;

    /// Whether the store is shared across serving processes.
    ///
    /// Session storage requires a shared backend; a process-local store
    /// would silently scope sessions to one worker.
    fn is_shared(&self) -> bool;
}

/// Returns true for values the cache refuses to store.
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => {
            n.as_i64() == Some(0) || n.as_u64() == Some(0) || n.as_f64() == Some(0.0)
        }
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Extension trait with typed methods for convenience.
///
/// Provides generic get/set methods that work with any serializable type,
/// preserving the swallow-errors contract of the base trait.
#[async_trait]
pub trait CacheExt: CacheBackend {
    /// Gets a typed value from the cache. Undecodable payloads count as a
    /// miss.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                debug!("Undecodable cached value for key '{}': {}", key, e);
                None
            }
        }
    }

    /// Sets a typed value in the cache.
    async fn set_json<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) {
        match serde_json::to_value(value) {
            Ok(encoded) => self.set(key, encoded, ttl).await,
            Err(e) => debug!("Unserializable value for key '{}': {}", key, e),
        }
    }
}

// Blanket implementation for all CacheBackend implementations
impl<T: CacheBackend + ?Sized> CacheExt for T {}
