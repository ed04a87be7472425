//! Welcome and health check handlers.

use crate::error::{AppError, ErrorKind, ServiceError};
use crate::extractors::ApiKey;
use crate::model::HealthCheckStatus;
use crate::response::ProblemDetails;
use crate::session::perform_db_healthcheck;
use crate::state::AppState;
use axum::{extract::State, Json};
use futures::FutureExt;
use serde::Serialize;
use utoipa::ToSchema;

pub const WELCOME: &str =
    "Welcome to the API template. For more information, read the documentation in /openapi.json";

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheck {
    pub status: HealthCheckStatus,
    pub output: String,
}

pub async fn root() -> Json<&'static str> {
    Json(WELCOME)
}

/// Health status of this API. Requires the API key.
#[utoipa::path(
    get,
    path = "/healthcheck/",
    tag = "Common",
    params(("X-API-Key" = String, Header, description = "API key")),
    responses(
        (status = 200, description = "Service is healthy", body = HealthCheck),
        (status = 401, description = "Unauthorized", body = ProblemDetails),
        (status = 403, description = "Forbidden", body = ProblemDetails),
        (status = 500, description = "DB health check failed", body = ProblemDetails)
    )
)]
pub async fn healthcheck(State(state): State<AppState>, api_key: ApiKey) -> Result<Json<HealthCheck>, AppError> {
    api_key.require()?;
    let healthy = state
        .sessions
        .session(|session| async move { Ok::<_, ServiceError>(perform_db_healthcheck(session).await?) }.boxed())
        .await;
    match healthy {
        Ok(true) => {
            tracing::info!("health check passed");
            Ok(Json(HealthCheck {
                status: HealthCheckStatus::Pass,
                output: "Service is healthy".into(),
            }))
        }
        Ok(false) => Err(AppError::new(ErrorKind::HealthCheckFailed, "DB health check failed")),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            Err(AppError::new(ErrorKind::HealthCheckFailed, err.detail))
        }
    }
}
