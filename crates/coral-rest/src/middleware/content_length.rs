//! Request body size guard.

use crate::responses::AppError;
use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_LENGTH, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use coral_core::CoralError;

/// Content-length guard state.
#[derive(Clone)]
pub struct ContentLengthState {
    pub max_length: u64,
}

impl ContentLengthState {
    /// Creates the guard state.
    #[must_use]
    pub const fn new(max_length: u64) -> Self {
        Self { max_length }
    }
}

/// Rejects POST requests without a `Content-Length` header (411) or with a
/// declared length above the configured maximum (413).
///
/// A hostile client can still declare a false length; this is a cheap
/// first gate, not the body limit itself.
pub async fn content_length_middleware(
    State(state): State<ContentLengthState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::POST {
        let declared = request
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        match declared {
            None => return AppError(CoralError::LengthRequired).into_response(),
            Some(length) if length > state.max_length => {
                return AppError(CoralError::PayloadTooLarge(length)).into_response();
            }
            Some(_) => {}
        }
    }

    next.run(request).await
}
