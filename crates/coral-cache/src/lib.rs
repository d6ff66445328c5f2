//! # Coral Cache
//!
//! Caching infrastructure: a uniform get/set/delete contract over two
//! interchangeable backends (process-local memory and Redis), a bounded
//! blocking executor, and a memoizing wrapper for arbitrary computations.
//!
//! The cache is an optimization, never a source of truth: backend failures
//! surface as misses and no-ops, not as errors.

pub mod backend;
pub mod blocking;
pub mod memoize;
pub mod memory;
pub mod redis;

pub use backend::{BackendKind, CacheBackend, CacheExt};
pub use blocking::BlockingPool;
pub use memoize::{default_fingerprint, KeyBuilder, MemoizeOptions, Memoizer};
pub use memory::{InMemoryCache, InMemoryCacheParameters};
pub use redis::{RedisCache, RedisCacheParameters, DEFAULT_OP_TIMEOUT};
