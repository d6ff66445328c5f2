//! Dependency injection module using Shaku.
//!
//! One module per cache backend shape:
//! - `MemoryCacheModule`: process-local cache for single-process deployments
//! - `RedisCacheModule`: shared Redis cache for multi-process deployments
//!
//! Exactly one module is built at startup from configuration and the
//! resolved `Arc<dyn CacheBackend>` handle is passed to every component
//! that caches; there is no mutable global.

use coral_cache::{
    CacheBackend, InMemoryCache, InMemoryCacheParameters, RedisCache, RedisCacheParameters,
};
use coral_config::{AppConfig, CacheBackendKind, CacheConfig, RedisConfig};
use coral_core::{CoralError, CoralResult};
use shaku::{module, HasComponent};
use std::sync::Arc;
use tracing::info;

// Module for deployments where the cache lives in process memory.
module! {
    pub MemoryCacheModule {
        components = [InMemoryCache],
        providers = [],
    }
}

// Module for deployments backed by a shared Redis store.
module! {
    pub RedisCacheModule {
        components = [RedisCache],
        providers = [],
    }
}

/// Trait for resolving the cache backend from any module.
pub trait CacheResolver {
    /// Resolves the cache backend from the module.
    fn cache(&self) -> Arc<dyn CacheBackend>;
}

impl CacheResolver for MemoryCacheModule {
    fn cache(&self) -> Arc<dyn CacheBackend> {
        self.resolve()
    }
}

impl CacheResolver for RedisCacheModule {
    fn cache(&self) -> Arc<dyn CacheBackend> {
        self.resolve()
    }
}

/// Builds the in-memory cache module.
#[must_use]
pub fn build_memory_cache_module(cache_config: &CacheConfig) -> Arc<MemoryCacheModule> {
    let module = MemoryCacheModule::builder()
        .with_component_parameters::<InMemoryCache>(InMemoryCacheParameters {
            store: Default::default(),
            prefix: cache_config.key_prefix.clone(),
        })
        .build();
    Arc::new(module)
}

/// Builds the Redis cache module, creating the connection pool.
pub fn build_redis_cache_module(
    cache_config: &CacheConfig,
    redis_config: &RedisConfig,
) -> CoralResult<Arc<RedisCacheModule>> {
    let pool = if redis_config.enabled {
        let redis_cfg = deadpool_redis::Config::from_url(redis_config.connection_url());
        let pool = redis_cfg
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| CoralError::cache(format!("Failed to create Redis pool: {}", e)))?;
        Some(pool)
    } else {
        None
    };

    let module = RedisCacheModule::builder()
        .with_component_parameters::<RedisCache>(RedisCacheParameters {
            pool,
            prefix: cache_config.key_prefix.clone(),
            op_timeout: redis_config.op_timeout(),
        })
        .build();
    Ok(Arc::new(module))
}

/// Builds the configured cache backend.
pub fn build_cache(config: &AppConfig) -> CoralResult<Arc<dyn CacheBackend>> {
    match config.cache.backend {
        CacheBackendKind::Memory => {
            info!("Using in-memory cache backend");
            Ok(build_memory_cache_module(&config.cache).cache())
        }
        CacheBackendKind::Redis => {
            info!("Using Redis cache backend");
            Ok(build_redis_cache_module(&config.cache, &config.redis)?.cache())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_cache::BackendKind;
    use serde_json::json;
    use shaku::HasComponent;

    #[test]
    fn test_module_trait_bounds() {
        fn _assert_cache_resolver<T: CacheResolver>() {}
        fn _assert_has_cache<T: HasComponent<dyn CacheBackend>>() {}

        _assert_cache_resolver::<MemoryCacheModule>();
        _assert_cache_resolver::<RedisCacheModule>();
        _assert_has_cache::<MemoryCacheModule>();
        _assert_has_cache::<RedisCacheModule>();
    }

    #[tokio::test]
    async fn test_memory_module_resolves_working_cache() {
        let module = build_memory_cache_module(&CacheConfig::default());
        let cache = module.cache();
        assert_eq!(cache.kind(), BackendKind::Memory);
        assert!(!cache.is_shared());

        cache.set("k", json!("v"), None).await;
        assert_eq!(cache.get("k").await, Some(json!("v")));
    }

    #[tokio::test]
    async fn test_disabled_redis_module_is_noop() {
        let redis_config = RedisConfig {
            enabled: false,
            ..RedisConfig::default()
        };
        let module = build_redis_cache_module(&CacheConfig::default(), &redis_config).unwrap();
        let cache = module.cache();
        assert_eq!(cache.kind(), BackendKind::Redis);
        assert!(cache.is_shared());

        cache.set("k", json!("v"), None).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[test]
    fn test_build_cache_selects_backend() {
        let config = AppConfig::default();
        let cache = build_cache(&config).unwrap();
        assert_eq!(cache.kind(), BackendKind::Memory);
    }
}
