//! Common routes: welcome, health check, OpenAPI document, metrics.

use crate::error::AppError;
use crate::handlers::common::{healthcheck, root};
use crate::metrics::METRICS_CONTENT_TYPE;
use crate::openapi::openapi;
use crate::state::AppState;
use axum::http::header;
use axum::response::IntoResponse;
use axum::{extract::State, routing::get, Json, Router};

async fn openapi_json(State(state): State<AppState>) -> Json<utoipa::openapi::OpenApi> {
    Json(openapi(&state.settings))
}

async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body))
}

/// GET /, GET /healthcheck/, GET /openapi.json, GET /metrics.
pub fn common_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/healthcheck/", get(healthcheck))
        .route("/healthcheck", get(healthcheck))
        .route("/openapi.json", get(openapi_json))
        .route("/metrics", get(metrics))
}
