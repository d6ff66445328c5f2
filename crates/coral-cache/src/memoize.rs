//! Cache-backed memoization for arbitrary computations.

use super::backend::{CacheBackend, CacheExt};
use super::blocking::BlockingPool;
use coral_core::CoralResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Caller-supplied key-building function, invoked with the computation
/// name and its serialized arguments.
pub type KeyBuilder = Arc<dyn Fn(&str, &Value) -> String + Send + Sync>;

/// Generates a key from the computation name and a rendering of its
/// arguments. Same inputs produce the same fingerprint.
#[must_use]
pub fn default_fingerprint(name: &str, args: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b":");
    hasher.update(args.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Per-call memoization options.
#[derive(Clone, Default)]
pub struct MemoizeOptions {
    /// Explicit static key, taking precedence over any key builder.
    pub cache_key: Option<String>,
    /// Custom key builder; used when no explicit key is given.
    pub key_builder: Option<KeyBuilder>,
    /// Namespace prepended to whichever key results.
    pub namespace: Option<String>,
    /// TTL for stored results.
    pub ttl: Option<Duration>,
}

impl MemoizeOptions {
    /// Creates empty options: default fingerprinting, no namespace, no TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed cache key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Uses a custom key builder.
    #[must_use]
    pub fn with_key_builder(mut self, builder: KeyBuilder) -> Self {
        self.key_builder = Some(builder);
        self
    }

    /// Prepends a namespace to the resolved key.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Stores results with a TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Memoizing wrapper around arbitrary computations.
///
/// Wraps a computation with cache-based result reuse keyed by a
/// deterministic fingerprint of its name and arguments. Asynchronous
/// computations run in place; synchronous ones are dispatched onto the
/// bounded [`BlockingPool`] so they never stall the event loop.
///
/// A computation that fails propagates its error untouched and writes
/// nothing. A result that serializes to an empty value is never stored
/// (the backends refuse it) and is therefore recomputed on every call.
#[derive(Clone)]
pub struct Memoizer {
    cache: Arc<dyn CacheBackend>,
    pool: BlockingPool,
}

impl Memoizer {
    /// Creates a memoizer over the given backend and blocking pool.
    #[must_use]
    pub fn new(cache: Arc<dyn CacheBackend>, pool: BlockingPool) -> Self {
        Self { cache, pool }
    }

    /// Resolves the cache key per the priority order: explicit key, then
    /// custom builder, then default fingerprint; namespace last.
    fn resolve_key(name: &str, args: &Value, opts: &MemoizeOptions) -> String {
        let key = if let Some(key) = &opts.cache_key {
            key.clone()
        } else if let Some(builder) = &opts.key_builder {
            builder(name, args)
        } else {
            default_fingerprint(name, args)
        };
        match &opts.namespace {
            Some(namespace) => format!("{}:{}", namespace, key),
            None => key,
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let hit = self.cache.get(key).await?;
        match serde_json::from_value(hit) {
            Ok(value) => {
                debug!("Memoization hit for key '{}'", key);
                Some(value)
            }
            Err(e) => {
                debug!("Discarding undecodable memoized value for key '{}': {}", key, e);
                None
            }
        }
    }

    /// Runs an asynchronous computation through the cache.
    pub async fn get_or_compute<T, A, F, Fut>(
        &self,
        name: &str,
        args: &A,
        opts: &MemoizeOptions,
        computation: F,
    ) -> CoralResult<T>
    where
        A: Serialize + ?Sized + Sync,
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = CoralResult<T>> + Send,
    {
        let args = serde_json::to_value(args).unwrap_or(Value::Null);
        let key = Self::resolve_key(name, &args, opts);

        if let Some(value) = self.lookup(&key).await {
            return Ok(value);
        }

        let value = computation().await?;
        self.cache.set_json(&key, &value, opts.ttl).await;
        Ok(value)
    }

    /// Runs a synchronous computation through the cache, off-loaded to the
    /// blocking pool on a miss.
    pub async fn get_or_compute_blocking<T, A, F>(
        &self,
        name: &str,
        args: &A,
        opts: &MemoizeOptions,
        computation: F,
    ) -> CoralResult<T>
    where
        A: Serialize + ?Sized + Sync,
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: FnOnce() -> CoralResult<T> + Send + 'static,
    {
        let args = serde_json::to_value(args).unwrap_or(Value::Null);
        let key = Self::resolve_key(name, &args, opts);

        if let Some(value) = self.lookup(&key).await {
            return Ok(value);
        }

        let value = self.pool.run(computation).await??;
        self.cache.set_json(&key, &value, opts.ttl).await;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCache;
    use coral_core::CoralError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn memoizer() -> Memoizer {
        Memoizer::new(Arc::new(InMemoryCache::new()), BlockingPool::new(4))
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = default_fingerprint("load_user", &json!([42]));
        let b = default_fingerprint("load_user", &json!([42]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_diverges_on_inputs() {
        let by_args = default_fingerprint("load_user", &json!([1]));
        let other_args = default_fingerprint("load_user", &json!([2]));
        let other_name = default_fingerprint("load_item", &json!([1]));
        assert_ne!(by_args, other_args);
        assert_ne!(by_args, other_name);
    }

    #[test]
    fn test_key_priority_order() {
        let args = json!([1]);
        let fixed = MemoizeOptions::new()
            .with_key("fixed")
            .with_key_builder(Arc::new(|_, _| "built".to_string()));
        assert_eq!(Memoizer::resolve_key("f", &args, &fixed), "fixed");

        let built = MemoizeOptions::new().with_key_builder(Arc::new(|name, args| {
            format!("{}:{}", name, args)
        }));
        assert_eq!(Memoizer::resolve_key("f", &args, &built), "f:[1]");

        let default = MemoizeOptions::new();
        assert_eq!(
            Memoizer::resolve_key("f", &args, &default),
            default_fingerprint("f", &args)
        );
    }

    #[test]
    fn test_namespace_prepended() {
        let opts = MemoizeOptions::new().with_key("k").with_namespace("ns");
        assert_eq!(Memoizer::resolve_key("f", &json!(null), &opts), "ns:k");
    }

    #[tokio::test]
    async fn test_second_call_skips_computation() {
        let memo = memoizer();
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = MemoizeOptions::new().with_key("answer");

        for _ in 0..2 {
            let calls = calls.clone();
            let value: u64 = memo
                .get_or_compute("compute", &(42u64,), &opts, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_args_recompute() {
        let memo = memoizer();
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = MemoizeOptions::new();

        for arg in [1u64, 2, 1] {
            let calls = calls.clone();
            let value: u64 = memo
                .get_or_compute("double", &(arg,), &opts, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(arg * 2)
                })
                .await
                .unwrap();
            assert_eq!(value, arg * 2);
        }

        // args 1 and 2 each computed once; the repeat of 1 hit the cache
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_never_cached() {
        let memo = memoizer();
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = MemoizeOptions::new().with_key("flaky");

        let first: CoralResult<u64> = {
            let calls = calls.clone();
            memo.get_or_compute("flaky", &(), &opts, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoralError::internal("transient"))
            })
            .await
        };
        assert!(first.is_err());

        let second: u64 = {
            let calls = calls.clone();
            memo.get_or_compute("flaky", &(), &opts, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await
            .unwrap()
        };
        assert_eq!(second, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_results_recomputed_every_call() {
        let memo = memoizer();
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = MemoizeOptions::new().with_key("empty");

        for _ in 0..3 {
            let calls = calls.clone();
            let value: Vec<u64> = memo
                .get_or_compute("empty", &(), &opts, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Vec::new())
                })
                .await
                .unwrap();
            assert!(value.is_empty());
        }

        // empty values are refused by the store, so every call recomputes
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_computation_memoized() {
        let memo = memoizer();
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = MemoizeOptions::new().with_key("blocking");

        for _ in 0..2 {
            let calls = calls.clone();
            let value: String = memo
                .get_or_compute_blocking("render", &("report",), &opts, move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("rendered".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "rendered");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_error_propagates() {
        let memo = memoizer();
        let opts = MemoizeOptions::new().with_key("bad");

        let result: CoralResult<u64> = memo
            .get_or_compute_blocking("bad", &(), &opts, || {
                Err(CoralError::internal("broken pipe"))
            })
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ttl_expires_memoized_value() {
        let memo = memoizer();
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = MemoizeOptions::new()
            .with_key("short")
            .with_ttl(Duration::from_millis(20));

        for _ in 0..2 {
            let calls = calls.clone();
            let _: u64 = memo
                .get_or_compute("short", &(), &opts, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(5)
                })
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(40)).await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
