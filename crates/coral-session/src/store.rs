//! Cache-backed session store.

use crate::{SessionData, SessionToken};
use coral_cache::{CacheBackend, CacheExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Server-side store mapping session tokens to session data.
///
/// A cache specialization: every key is a [`SessionToken`] namespaced under
/// the session cookie name, every value a whole [`SessionData`] mapping.
/// Unlike generic cache usage, the backend here must be shared across all
/// serving processes; a process-local backend silently partitions sessions
/// per worker, so construction flags it (configuration validation rejects
/// it outright outside development).
///
/// Write failures degrade to "session not persisted" and are never
/// surfaced; the user logs back in rather than the request failing.
#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<dyn CacheBackend>,
    cookie_name: String,
}

impl SessionStore {
    /// Creates a store over the given backend, namespacing all keys under
    /// the session cookie name.
    #[must_use]
    pub fn new(cache: Arc<dyn CacheBackend>, cookie_name: impl Into<String>) -> Self {
        let cookie_name = cookie_name.into();
        if !cache.is_shared() {
            warn!(
                backend = %cache.kind(),
                "Session store is backed by a process-local cache; sessions \
                 will not survive across workers"
            );
        }
        Self { cache, cookie_name }
    }

    fn key(&self, token: &SessionToken) -> String {
        format!("{}:{}", self.cookie_name, token.as_str())
    }

    /// Loads the session data for a token. Expired, unknown, and
    /// undecodable entries all come back as `None`.
    pub async fn load(&self, token: &SessionToken) -> Option<SessionData> {
        match self.cache.get(&self.key(token)).await {
            Some(Value::Object(data)) => Some(data),
            Some(_) => {
                debug!("Discarding non-mapping session payload for token");
                None
            }
            None => None,
        }
    }

    /// Persists the whole session mapping atomically under the token.
    pub async fn save(&self, token: &SessionToken, data: &SessionData, ttl: Option<Duration>) {
        self.cache.set_json(&self.key(token), data, ttl).await;
    }

    /// Deletes the session entry for a token.
    pub async fn remove(&self, token: &SessionToken) {
        self.cache.delete(&self.key(token)).await;
    }
}
