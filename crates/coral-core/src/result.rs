//! Result type aliases for Coral.

use crate::CoralError;

/// A specialized `Result` type for Coral operations.
pub type CoralResult<T> = Result<T, CoralError>;

/// A boxed future returning a `CoralResult`.
pub type BoxFuture<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = CoralResult<T>> + Send + 'a>>;
