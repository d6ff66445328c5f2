//! Cookie-backed session middleware.

use axum::{
    body::Body,
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use coral_config::SessionConfig;
use coral_session::{Session, SessionStore, SessionToken};
use std::sync::Arc;
use tracing::debug;

/// Session middleware state.
#[derive(Clone)]
pub struct SessionLayerState {
    pub store: SessionStore,
    pub config: Arc<SessionConfig>,
}

impl SessionLayerState {
    /// Creates the middleware state.
    #[must_use]
    pub fn new(store: SessionStore, config: Arc<SessionConfig>) -> Self {
        Self { store, config }
    }
}

/// Session middleware.
///
/// Hydrates a mutable [`Session`] from the request's cookie before any
/// handler runs and persists or clears it after the handler finishes, at
/// the single point where response headers are finalized:
///
/// - session non-empty: reuse the inbound token or mint one, write the
///   whole mapping to the store, and append a `Set-Cookie` header;
/// - session emptied by a handler: delete the store entry and append an
///   expiring `Set-Cookie`;
/// - session empty and was already empty: no `Set-Cookie` at all.
///
/// Concurrent requests carrying the same token are not serialized against
/// each other; persistence order follows response-completion order and the
/// last writer wins. WebSocket upgrade handshakes pass through with the
/// same hydration; session semantics attach only to the request/response
/// exchange itself.
pub async fn session_middleware(
    State(state): State<SessionLayerState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let token = jar
        .get(&state.config.cookie_name)
        .map(|cookie| SessionToken::from(cookie.value()));

    let session = match &token {
        Some(token) => match state.store.load(token).await {
            Some(data) => Session::new(data, Some(token.clone()), false),
            // expired or unknown token: start empty but keep the token so a
            // cleared session can still delete the right store entry
            None => Session::new(coral_session::SessionData::new(), Some(token.clone()), true),
        },
        None => Session::empty(),
    };

    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;
    finalize(&state, &session, response.headers_mut()).await;
    response
}

/// Applies the end-of-request session transition and emits `Set-Cookie`.
async fn finalize(state: &SessionLayerState, session: &Session, headers: &mut HeaderMap) {
    let data = session.snapshot();

    if !data.is_empty() {
        // We have session data to persist.
        let token = session.token().unwrap_or_else(SessionToken::generate);
        state
            .store
            .save(&token, &data, state.config.max_age())
            .await;
        append_cookie(headers, &persist_cookie(&state.config, &token));
    } else if !session.was_initially_empty() {
        // The session has been cleared.
        if let Some(token) = session.token() {
            state.store.remove(&token).await;
        }
        append_cookie(headers, &clear_cookie(&state.config));
    }
}

fn append_cookie(headers: &mut HeaderMap, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => debug!("Dropping malformed session cookie header: {}", e),
    }
}

/// Cookie attributes shared by the persist and clear forms.
fn security_flags(config: &SessionConfig) -> String {
    let mut flags = format!("httponly; samesite={}", config.same_site.as_str());
    if config.https_only {
        // Secure flag can be used with HTTPS only
        flags.push_str("; secure");
    }
    if let Some(domain) = &config.domain {
        flags.push_str("; domain=");
        flags.push_str(domain);
    }
    flags
}

fn persist_cookie(config: &SessionConfig, token: &SessionToken) -> String {
    let max_age = match config.max_age_secs {
        Some(secs) => format!("Max-Age={}; ", secs),
        None => String::new(),
    };
    format!(
        "{}={}; path={}; {}{}",
        config.cookie_name,
        token,
        config.path,
        max_age,
        security_flags(config)
    )
}

fn clear_cookie(config: &SessionConfig) -> String {
    format!(
        "{}=null; path={}; expires=Thu, 01 Jan 1970 00:00:00 GMT; {}",
        config.cookie_name,
        config.path,
        security_flags(config)
    )
}
