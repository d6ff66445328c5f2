//! Collaborator interfaces consumed by the application.
//!
//! The caching and session subsystem never talks to a database or an
//! identity provider directly; it is written against these seams and the
//! concrete implementations are injected per deployment.

use crate::CoralResult;
use async_trait::async_trait;
use serde_json::Value;

/// Comparison operator for repository filter predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

/// A single field predicate, e.g. `status == "active"`.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub field: String,
    pub op: Comparison,
    pub value: Value,
}

impl Predicate {
    /// Creates an equality predicate.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: Comparison::Eq,
            value: value.into(),
        }
    }
}

/// Result ordering for repository queries.
#[derive(Debug, Clone)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

/// A repository query: predicates, ordering, and a result window.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub predicates: Vec<Predicate>,
    pub order_by: Option<Ordering>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Filter {
    /// Adds a predicate to the filter.
    #[must_use]
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Sets the result window.
    #[must_use]
    pub fn window(mut self, limit: u64, offset: u64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// Base repository trait for persistence operations.
///
/// The persistence layer is an opaque collaborator: query semantics live
/// entirely behind this trait and are injected per request.
#[async_trait]
pub trait Repository<T, ID>: Send + Sync
where
    T: Send + Sync,
    ID: Send + Sync,
{
    /// Finds a record by its primary key.
    async fn get(&self, id: &ID) -> CoralResult<Option<T>>;

    /// Finds records matching a filter.
    async fn filter(&self, filter: Filter) -> CoralResult<Vec<T>>;

    /// Creates a new record.
    async fn create(&self, record: &T) -> CoralResult<T>;

    /// Updates an existing record.
    async fn update(&self, record: &T) -> CoralResult<T>;

    /// Deletes a record by its primary key. Returns `true` if it existed.
    async fn delete(&self, id: &ID) -> CoralResult<bool>;
}

/// Credentials presented to the external authentication service.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Claims mapping decoded from an authentication token.
pub type Claims = serde_json::Map<String, Value>;

/// Client for the external authentication service.
///
/// Token issuance and validation happen over the network in a separate
/// service; this trait is the only view of it the application has.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Exchanges credentials for an opaque token.
    async fn authenticate(&self, credentials: &Credentials) -> CoralResult<String>;

    /// Decodes a token into its claims mapping.
    async fn decode(&self, token: &str, verification_key: &str) -> CoralResult<Claims>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoralError;
    use mockall::mock;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u64,
        name: String,
    }

    mock! {
        ItemRepo {}

        #[async_trait]
        impl Repository<Item, u64> for ItemRepo {
            async fn get(&self, id: &u64) -> CoralResult<Option<Item>>;
            async fn filter(&self, filter: Filter) -> CoralResult<Vec<Item>>;
            async fn create(&self, record: &Item) -> CoralResult<Item>;
            async fn update(&self, record: &Item) -> CoralResult<Item>;
            async fn delete(&self, id: &u64) -> CoralResult<bool>;
        }
    }

    #[tokio::test]
    async fn test_repository_get_through_mock() {
        let mut repo = MockItemRepo::new();
        repo.expect_get().returning(|id| {
            Ok(Some(Item {
                id: *id,
                name: "widget".to_string(),
            }))
        });

        let found = repo.get(&7).await.unwrap();
        assert_eq!(found.unwrap().id, 7);
    }

    #[tokio::test]
    async fn test_repository_missing_record() {
        let mut repo = MockItemRepo::new();
        repo.expect_get().returning(|_| Ok(None));
        repo.expect_delete().returning(|_| Ok(false));

        assert!(repo.get(&1).await.unwrap().is_none());
        assert!(!repo.delete(&1).await.unwrap());
    }

    mock! {
        Auth {}

        #[async_trait]
        impl AuthClient for Auth {
            async fn authenticate(&self, credentials: &Credentials) -> CoralResult<String>;
            async fn decode(&self, token: &str, verification_key: &str) -> CoralResult<Claims>;
        }
    }

    #[tokio::test]
    async fn test_auth_client_decode_failure() {
        let mut auth = MockAuth::new();
        auth.expect_decode()
            .returning(|_, _| Err(CoralError::unauthorized("token expired")));

        let err = auth.decode("stale", "key").await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_filter_builder() {
        let filter = Filter::default()
            .with(Predicate::eq("status", json!("active")))
            .window(20, 40);

        assert_eq!(filter.predicates.len(), 1);
        assert_eq!(filter.limit, Some(20));
        assert_eq!(filter.offset, Some(40));
    }
}
