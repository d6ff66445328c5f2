//! Session extractor.

use crate::responses::AppError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use coral_core::CoralError;
use coral_session::Session;

/// Extractor for the request's session mapping.
///
/// The session middleware attaches a [`Session`] to every request; this
/// extractor hands the same shared handle to the handler, so mutations are
/// visible to the middleware at response time.
pub struct CurrentSession(pub Session);

impl std::ops::Deref for CurrentSession {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            // the session layer is missing from the middleware stack
            AppError(CoralError::internal(
                "Session middleware is not installed on this route",
            ))
        })?;

        Ok(CurrentSession(session))
    }
}
