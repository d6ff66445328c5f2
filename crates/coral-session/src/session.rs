//! The mutable per-request session handle.

use crate::SessionToken;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Session contents: a mapping from string keys to JSON values, scoped to
/// one request lifecycle.
pub type SessionData = serde_json::Map<String, Value>;

struct SessionInner {
    data: SessionData,
    /// Token presented by the inbound cookie, if any. Kept even when the
    /// lookup missed so a cleared session can delete the right store entry.
    token: Option<SessionToken>,
    /// Whether the session was empty when the request entered.
    initial_empty: bool,
}

/// Shared, mutable session mapping attached to a request.
///
/// Handlers read and mutate this freely with ordinary mapping semantics;
/// the middleware inspects the final state exactly once, when response
/// headers are about to be written. Persistence is an atomic write of the
/// whole mapping. Concurrent requests sharing one token are not serialized
/// against each other: the last response to complete wins.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    /// Creates a fresh, empty session with no backing token.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(SessionData::new(), None, true)
    }

    /// Creates a session hydrated from the store.
    #[must_use]
    pub fn new(data: SessionData, token: Option<SessionToken>, initial_empty: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                data,
                token,
                initial_empty,
            })),
        }
    }

    /// Gets a typed value. Returns `None` when the key is absent or holds
    /// a value of a different shape.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let inner = self.inner.lock();
        let value = inner.data.get(key)?.clone();
        drop(inner);
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                debug!("Session value for '{}' has unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Inserts a value, replacing any previous one for the key.
    pub fn insert<T: Serialize>(&self, key: impl Into<String>, value: T) {
        match serde_json::to_value(value) {
            Ok(encoded) => {
                self.inner.lock().data.insert(key.into(), encoded);
            }
            Err(e) => debug!("Dropping unserializable session value: {}", e),
        }
    }

    /// Removes a key, returning its previous value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.lock().data.remove(key)
    }

    /// Removes every entry. An initially non-empty session cleared this way
    /// is deleted from the store at response time.
    pub fn clear(&self) {
        self.inner.lock().data.clear();
    }

    /// Whether the mapping holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().data.is_empty()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().data.len()
    }

    /// Whether the mapping contains the key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.lock().data.contains_key(key)
    }

    /// Token carried by the inbound cookie, if any.
    #[must_use]
    pub fn token(&self) -> Option<SessionToken> {
        self.inner.lock().token.clone()
    }

    /// Whether the session was empty when the request entered.
    #[must_use]
    pub fn was_initially_empty(&self) -> bool {
        self.inner.lock().initial_empty
    }

    /// Copies the current mapping out for persistence.
    #[must_use]
    pub fn snapshot(&self) -> SessionData {
        self.inner.lock().data.clone()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Session")
            .field("len", &inner.data.len())
            .field("initial_empty", &inner.initial_empty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_session() {
        let session = Session::empty();
        assert!(session.is_empty());
        assert!(session.was_initially_empty());
        assert!(session.token().is_none());
    }

    #[test]
    fn test_insert_and_get() {
        let session = Session::empty();
        session.insert("user_id", 42u64);
        assert_eq!(session.get::<u64>("user_id"), Some(42));
        assert_eq!(session.len(), 1);
        assert!(session.contains_key("user_id"));
    }

    #[test]
    fn test_get_with_wrong_shape() {
        let session = Session::empty();
        session.insert("user_id", "not a number");
        assert_eq!(session.get::<u64>("user_id"), None);
    }

    #[test]
    fn test_remove_and_clear() {
        let session = Session::empty();
        session.insert("a", 1);
        session.insert("b", 2);

        assert_eq!(session.remove("a"), Some(json!(1)));
        assert_eq!(session.remove("a"), None);

        session.clear();
        assert!(session.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let session = Session::empty();
        let other = session.clone();
        other.insert("shared", true);
        assert_eq!(session.get::<bool>("shared"), Some(true));
    }

    #[test]
    fn test_hydrated_session_keeps_bookkeeping() {
        let mut data = SessionData::new();
        data.insert("user_id".to_string(), json!(7));
        let token = SessionToken::from("tok");
        let session = Session::new(data, Some(token.clone()), false);

        assert!(!session.was_initially_empty());
        assert_eq!(session.token(), Some(token));
        assert_eq!(session.get::<u64>("user_id"), Some(7));
    }

    #[test]
    fn test_snapshot_copies_mapping() {
        let session = Session::empty();
        session.insert("k", "v");
        let snapshot = session.snapshot();
        session.insert("k2", "v2");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(session.len(), 2);
    }
}
