//! OpenAPI document assembly.

use crate::controllers::health_controller;
use axum::Json;
use utoipa::OpenApi;

/// API documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Coral API",
        description = "Web application scaffold with request-scoped caching and cookie-backed sessions"
    ),
    paths(
        health_controller::health_check,
        health_controller::readiness_check,
        health_controller::liveness_check,
    ),
    components(schemas(
        health_controller::HealthResponse,
        health_controller::ReadinessResponse,
    )),
    tags(
        (name = "health", description = "Service health endpoints")
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI document as JSON.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
