//! Main application router.

use crate::{
    controllers::health_controller,
    middleware::{
        content_length_middleware, logging_middleware, request_id_middleware,
        session_middleware, ContentLengthState, SessionLayerState,
    },
    openapi,
    state::AppState,
};
use axum::{middleware, routing::get, Router};
use coral_config::ServerConfig;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Creates the main application router.
///
/// Middleware runs outside-in: request-id first, then logging, tracing,
/// CORS, compression, the content-length guard, and finally the session
/// layer immediately around the handlers. Session hydration therefore
/// happens after every transport-level concern and before any handler
/// logic.
pub fn create_router(
    state: AppState,
    session_state: Option<SessionLayerState>,
    server_config: &ServerConfig,
) -> Router {
    let cors = create_cors_layer(server_config);
    let content_length_state = ContentLengthState::new(server_config.max_body_size);

    let mut router = Router::new()
        // Health endpoints
        .merge(health_controller::router(state.clone()))
        // OpenAPI spec
        .route("/openapi.json", get(openapi::openapi_json))
        // Root endpoint
        .route("/", get(root));

    if let Some(session_state) = session_state {
        router = router.layer(middleware::from_fn_with_state(
            session_state,
            session_middleware,
        ));
    }

    let router = router
        .layer(middleware::from_fn_with_state(
            content_length_state,
            content_length_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware));

    info!("Router created with health endpoints and OpenAPI spec at /openapi.json");
    router
}

/// Creates a CORS layer based on server configuration.
fn create_cors_layer(server_config: &ServerConfig) -> CorsLayer {
    if server_config.cors_enabled {
        if server_config.cors_origins.contains(&"*".to_string()) {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    }
}

/// Root endpoint handler.
async fn root() -> &'static str {
    "Coral API v1"
}
