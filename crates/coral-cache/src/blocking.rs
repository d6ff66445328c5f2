//! Bounded executor for synchronous computations.

use coral_core::{CoralError, CoralResult};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// A bounded pool for off-loading blocking work.
///
/// The event loop must never run synchronous computations in place; this
/// pool dispatches them onto `spawn_blocking` behind a semaphore with a
/// fixed concurrency limit, so a burst of blocking calls queues instead of
/// saturating the runtime's blocking threads.
#[derive(Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
}

impl BlockingPool {
    /// Creates a pool allowing at most `size` concurrent computations.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size)),
        }
    }

    /// Runs a blocking computation, waiting for a free slot first.
    pub async fn run<T, F>(&self, f: F) -> CoralResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| CoralError::internal("blocking pool is closed"))?;

        tokio::task::spawn_blocking(move || {
            // hold the permit for the lifetime of the computation
            let _permit = permit;
            f()
        })
        .await
        .map_err(|e| CoralError::internal(format!("blocking task failed: {}", e)))
    }

    /// Number of currently free slots.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
