//! Process-local in-memory cache implementation.

use super::backend::{is_empty_value, BackendKind, CacheBackend};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use shaku::Component;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// A stored value and its optional absolute expiry instant.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Simple in-memory cache with TTL support.
///
/// Expiry is lazy: entries are checked and physically removed on read, not
/// swept proactively. The store is exclusive to one process and guarded by
/// a lock so interleaved requests observe consistent read-modify-writes.
/// Values are held as-is with no serialization round trip, so entries are
/// returned exactly as stored.
#[derive(Component)]
#[shaku(interface = CacheBackend)]
pub struct InMemoryCache {
    #[shaku(default)]
    store: Mutex<HashMap<String, StoredEntry>>,
    #[shaku(default)]
    prefix: Option<String>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            prefix: None,
        }
    }

    /// Creates an empty cache whose keys all carry a fixed prefix.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            prefix: Some(prefix.into()),
        }
    }

    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Number of live entries, including not-yet-collected expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    /// Returns true when the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        if key.is_empty() {
            return None;
        }
        let key = self.full_key(key);
        let mut store = self.store.lock();
        match store.get(&key) {
            Some(entry) if entry.is_expired(Instant::now()) => {
                // expired, remove in place
                store.remove(&key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        if key.is_empty() {
            return;
        }
        if is_empty_value(&value) {
            debug!("Skipping cache of empty value for key '{}'", key);
            return;
        }
        let key = self.full_key(key);
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.store.lock().insert(key, StoredEntry { value, expires_at });
    }

    async fn delete(&self, key: &str) {
        if key.is_empty() {
            return;
        }
        let key = self.full_key(key);
        self.store.lock().remove(&key);
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn is_shared(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = InMemoryCache::new();
        cache.set("greeting", json!("hello"), None).await;
        assert_eq!(cache.get("greeting").await, Some(json!("hello")));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.get("nothing").await, None);
    }

    #[tokio::test]
    async fn test_overwrite_existing_entry() {
        let cache = InMemoryCache::new();
        cache.set("k", json!(1), None).await;
        cache.set("k", json!(2), None).await;
        assert_eq!(cache.get("k").await, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_ttl_expiry_removes_entry() {
        let cache = InMemoryCache::new();
        cache
            .set("short", json!("lived"), Some(Duration::from_millis(20)))
            .await;
        assert_eq!(cache.get("short").await, Some(json!("lived")));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("short").await, None);
        // the expired entry is gone from the store, not just masked
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_no_ttl_entry_persists() {
        let cache = InMemoryCache::new();
        cache.set("stable", json!(42), None).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("stable").await, Some(json!(42)));
    }

    #[tokio::test]
    async fn test_empty_values_not_cached() {
        let cache = InMemoryCache::new();
        cache.set("empty-string", json!(""), None).await;
        cache.set("zero", json!(0), None).await;
        cache.set("empty-list", json!([]), None).await;

        assert_eq!(cache.get("empty-string").await, None);
        assert_eq!(cache.get("zero").await, None);
        assert_eq!(cache.get("empty-list").await, None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let cache = InMemoryCache::new();
        cache.set("k", json!("v"), None).await;
        cache.delete("k").await;
        cache.delete("k").await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_prefix_is_invisible_to_callers() {
        let plain = InMemoryCache::new();
        let prefixed = InMemoryCache::with_prefix("ns");
        prefixed.set("k", json!("v"), None).await;

        assert_eq!(prefixed.get("k").await, Some(json!("v")));
        assert_eq!(plain.get("k").await, None);

        let store = prefixed.store.lock();
        assert!(store.contains_key("ns:k"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutation_never_tears() {
        let cache = Arc::new(InMemoryCache::new());
        let mut handles = Vec::new();

        for i in 1..=16u64 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    cache.set("shared", json!({"writer": i, "check": i}), None).await;
                    if let Some(value) = cache.get("shared").await {
                        // the value must be exactly one prior write, never a blend
                        let writer = value["writer"].as_u64().unwrap();
                        let check = value["check"].as_u64().unwrap();
                        assert_eq!(writer, check);
                    }
                    cache.delete("shared").await;
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }
}
