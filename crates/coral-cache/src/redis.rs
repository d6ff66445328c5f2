//! Redis-based cache implementation.

use super::backend::{is_empty_value, BackendKind, CacheBackend};
use async_trait::async_trait;
use coral_core::{CoralError, CoralResult};
use deadpool_redis::{redis::AsyncCommands, Pool};
use serde_json::Value;
use shaku::Component;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-operation timeout for Redis round trips.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(500);

/// Redis-backed cache with JSON serialization.
///
/// Values cross the wire as UTF-8 JSON text, decoded back on read; the
/// round trip is the exact inverse for any JSON-representable value. Every
/// failure mode (pool exhaustion, network error, operation timeout,
/// undecodable payload) degrades to a miss or no-op rather than an error.
#[derive(Component)]
#[shaku(interface = CacheBackend)]
pub struct RedisCache {
    /// Redis connection pool. `None` disables the cache entirely.
    pool: Option<Pool>,
    /// Optional key prefix applied to every key.
    #[shaku(default)]
    prefix: Option<String>,
    /// Per-operation timeout.
    #[shaku(default = DEFAULT_OP_TIMEOUT)]
    op_timeout: Duration,
}

impl RedisCache {
    /// Creates a new Redis cache on an existing pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self {
            pool: Some(pool),
            prefix: None,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    /// Sets a fixed prefix applied to every key, invisible to callers.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the per-operation timeout.
    #[must_use]
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Creates a no-op cache (for when Redis is disabled).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            pool: None,
            prefix: None,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    /// Whether a pool is attached.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Get a connection from the pool.
    async fn conn(&self) -> CoralResult<deadpool_redis::Connection> {
        match &self.pool {
            Some(pool) => pool
                .get()
                .await
                .map_err(|e| CoralError::cache(format!("Failed to get Redis connection: {}", e))),
            None => Err(CoralError::cache("Cache is disabled".to_string())),
        }
    }

    async fn try_get(&self, key: &str) -> CoralResult<Option<String>> {
        let mut conn = self.conn().await?;
        conn.get(key)
            .await
            .map_err(|e| CoralError::cache(format!("Failed to get key '{}': {}", key, e)))
    }

    async fn try_set(&self, key: &str, payload: String, ttl: Option<Duration>) -> CoralResult<()> {
        let mut conn = self.conn().await?;
        match ttl {
            Some(ttl) => {
                let ttl_secs = ttl.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, payload, ttl_secs)
                    .await
                    .map_err(|e| CoralError::cache(format!("Failed to set key '{}': {}", key, e)))?;
            }
            None => {
                conn.set::<_, _, ()>(key, payload)
                    .await
                    .map_err(|e| CoralError::cache(format!("Failed to set key '{}': {}", key, e)))?;
            }
        }
        Ok(())
    }

    async fn try_delete(&self, key: &str) -> CoralResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| CoralError::cache(format!("Failed to delete key '{}': {}", key, e)))
    }

    /// Decodes a stored payload; undecodable payloads count as a miss.
    fn decode(key: &str, raw: &str) -> Option<Value> {
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Undecodable payload for key '{}': {}", key, e);
                None
            }
        }
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Option<Value> {
        if key.is_empty() || !self.is_enabled() {
            return None;
        }
        let key = self.full_key(key);
        match tokio::time::timeout(self.op_timeout, self.try_get(&key)).await {
            Ok(Ok(Some(raw))) => {
                debug!("Cache hit for key '{}'", key);
                Self::decode(&key, &raw)
            }
            Ok(Ok(None)) => {
                debug!("Cache miss for key '{}'", key);
                None
            }
            Ok(Err(e)) => {
                debug!("Treating unreachable backend as miss for key '{}': {}", key, e);
                None
            }
            Err(_) => {
                warn!("Redis GET timed out after {:?} for key '{}'", self.op_timeout, key);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        if key.is_empty() || !self.is_enabled() {
            return;
        }
        if is_empty_value(&value) {
            debug!("Skipping cache of empty value for key '{}'", key);
            return;
        }
        let key = self.full_key(key);
        let payload = value.to_string();
        match tokio::time::timeout(self.op_timeout, self.try_set(&key, payload, ttl)).await {
            Ok(Ok(())) => debug!("Cached key '{}' with TTL {:?}", key, ttl),
            Ok(Err(e)) => debug!("Skipping cache write for key '{}': {}", key, e),
            Err(_) => warn!("Redis SET timed out after {:?} for key '{}'", self.op_timeout, key),
        }
    }

    async fn delete(&self, key: &str) {
        if key.is_empty() || !self.is_enabled() {
            return;
        }
        let key = self.full_key(key);
        match tokio::time::timeout(self.op_timeout, self.try_delete(&key)).await {
            Ok(Ok(())) => debug!("Deleted key '{}'", key),
            Ok(Err(e)) => debug!("Skipping cache delete for key '{}': {}", key, e),
            Err(_) => warn!("Redis DEL timed out after {:?} for key '{}'", self.op_timeout, key),
        }
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }

    fn is_shared(&self) -> bool {
        true
    }
}
