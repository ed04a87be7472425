//! Typed errors and HTTP mapping.
//!
//! Persistence failures travel as [`DbError`] until they cross a session scope,
//! where [`translate_persistence_error`] turns them into the single domain error
//! [`AppError`]. Status codes and titles for every [`ErrorKind`] come from one table.

use crate::response::ProblemDetails;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("validation: {0}")]
    Validation(String),
}

/// Identifies the row a single-row lookup was after.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LookupContext {
    pub entity: &'static str,
    pub id: Uuid,
}

/// Persistence-layer failure, not yet translated for callers.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("DatabaseSessionManager is not initialized")]
    NotInitialized,
    #[error("session is closed")]
    SessionClosed,
    #[error("unsupported database dialect in url: {0}")]
    UnsupportedDialect(String),
    #[error("no row found for {} id '{}'", .0.entity, .0.id)]
    NoResultFound(LookupContext),
    #[error("multiple rows found for {} id '{}'", .0.entity, .0.id)]
    MultipleResultsFound(LookupContext),
    #[error("unknown column '{column}' on {entity}")]
    UnknownColumn { entity: &'static str, column: String },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Category of a caller-visible failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    UnprocessableEntity,
    Validation,
    ModelValidation,
    TooManyRequests,
    InternalServer,
    ServiceUnavailable,
    HealthCheckFailed,
    UniqueConstraint,
    ForeignKey,
    Orm,
    NotInitialized,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        self.entry().0
    }

    pub fn title(self) -> &'static str {
        self.entry().1
    }

    fn entry(self) -> (StatusCode, &'static str) {
        match self {
            ErrorKind::BadRequest => (StatusCode::BAD_REQUEST, "Bad Request"),
            ErrorKind::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "Not Found"),
            ErrorKind::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
            ErrorKind::UnprocessableEntity => (StatusCode::UNPROCESSABLE_ENTITY, "Unprocessable Entity"),
            ErrorKind::Validation => (StatusCode::UNPROCESSABLE_ENTITY, "Validation Error"),
            ErrorKind::ModelValidation => (StatusCode::UNPROCESSABLE_ENTITY, "Model Validation Error"),
            ErrorKind::TooManyRequests => (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"),
            ErrorKind::InternalServer => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            ErrorKind::ServiceUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable"),
            ErrorKind::HealthCheckFailed => (StatusCode::INTERNAL_SERVER_ERROR, "DB health check failed"),
            ErrorKind::UniqueConstraint => (StatusCode::CONFLICT, "Database Unique Constraint"),
            ErrorKind::ForeignKey => (StatusCode::CONFLICT, "Database Foreign Key Violation"),
            ErrorKind::Orm => (StatusCode::CONFLICT, "Database or ORM Error"),
            ErrorKind::NotInitialized => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database Session Manager Not Initialized",
            ),
        }
    }
}

/// Log level for an error when it is rendered. Never affects control flow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
    Debug,
}

/// One per-field validation message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct FieldError {
    pub parameter: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl FieldError {
    pub fn new(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            parameter: Some(parameter.into()),
            message: Some(message.into()),
            kind: None,
        }
    }
}

#[derive(Error, Debug, Clone)]
#[error("{}: {}", .kind.title(), .detail)]
pub struct AppError {
    pub kind: ErrorKind,
    pub detail: Value,
    pub url: Option<String>,
    pub severity: Severity,
    pub validation_errors: Vec<FieldError>,
}

impl AppError {
    pub fn new(kind: ErrorKind, detail: impl Into<Value>) -> Self {
        AppError {
            kind,
            detail: detail.into(),
            url: None,
            severity: Severity::default(),
            validation_errors: Vec::new(),
        }
    }

    pub fn not_found(detail: impl Into<Value>) -> Self {
        Self::new(ErrorKind::NotFound, detail)
    }

    pub fn bad_request(detail: impl Into<Value>) -> Self {
        Self::new(ErrorKind::BadRequest, detail)
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized, "Unauthorized").with_severity(Severity::Warning)
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden, "Forbidden").with_severity(Severity::Warning)
    }

    pub fn internal(detail: impl Into<Value>) -> Self {
        Self::new(ErrorKind::InternalServer, detail)
    }

    /// Request input failed validation; one entry per offending field.
    pub fn validation(errors: Vec<FieldError>) -> Self {
        AppError {
            validation_errors: errors,
            ..Self::new(ErrorKind::Validation, "Invalid request parameters").with_severity(Severity::Info)
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    fn log(&self) {
        let status = self.kind.status().as_u16();
        let title = self.kind.title();
        let url = self.url.as_deref().unwrap_or("");
        match self.severity {
            Severity::Error => tracing::error!(status, title, url, detail = %self.detail, "api error"),
            Severity::Warning => tracing::warn!(status, title, url, detail = %self.detail, "api error"),
            Severity::Info => tracing::info!(status, title, url, detail = %self.detail, "api error"),
            Severity::Debug => tracing::debug!(status, title, url, detail = %self.detail, "api error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let AppError {
            kind,
            detail,
            url,
            validation_errors,
            ..
        } = self;
        let detail = match (detail, url) {
            (Value::String(s), Some(url)) => Value::String(format!("{} URL=[{}]", s, url)),
            (detail, _) => detail,
        };
        let body = ProblemDetails {
            title: kind.title().to_string(),
            detail,
            status: kind.status().as_u16(),
            validation_errors,
        };
        (kind.status(), Json(body)).into_response()
    }
}

/// Error returned by work running inside a session scope: either a persistence
/// failure still awaiting translation or an already-domain error.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Persistence(#[from] DbError),
    #[error(transparent)]
    Domain(#[from] AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Persistence(DbError::Sqlx(e))
    }
}

/// Classify a persistence failure into a domain error.
///
/// Integrity violations (SQLSTATE class 23) become `ForeignKey` when the
/// violated constraint is a foreign key and `UniqueConstraint` otherwise;
/// every other persistence failure becomes `Orm`.
pub fn translate_persistence_error(err: DbError) -> AppError {
    match err {
        DbError::NotInitialized => AppError::new(ErrorKind::NotInitialized, err.to_string()),
        DbError::Sqlx(sqlx::Error::Database(db)) if is_integrity_violation(db.as_ref()) => {
            let detail = db.message().to_string();
            if db.is_foreign_key_violation() {
                tracing::debug!(constraint = ?db.constraint(), table = ?db.table(), "foreign key violation");
                AppError::new(ErrorKind::ForeignKey, detail)
            } else {
                tracing::debug!(constraint = ?db.constraint(), table = ?db.table(), "unique constraint violation");
                AppError::new(ErrorKind::UniqueConstraint, detail)
            }
        }
        other => {
            tracing::debug!(error = %other, "orm error");
            AppError::new(ErrorKind::Orm, other.to_string())
        }
    }
}

fn is_integrity_violation(err: &dyn sqlx::error::DatabaseError) -> bool {
    err.code().map(|c| c.starts_with("23")).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn kinds_map_to_documented_statuses() {
        assert_eq!(ErrorKind::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::UniqueConstraint.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorKind::ForeignKey.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorKind::Orm.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorKind::Validation.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ErrorKind::ModelValidation.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ErrorKind::TooManyRequests.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ErrorKind::ServiceUnavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn renders_problem_details() {
        let response = AppError::not_found("missing").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["title"], "Not Found");
        assert_eq!(body["detail"], "missing");
        assert_eq!(body["status"], 404);
        assert!(body.get("validation_errors").is_none());
    }

    #[tokio::test]
    async fn appends_url_to_string_detail() {
        let response = AppError::bad_request("upstream said no")
            .with_url("http://upstream/x")
            .into_response();
        let body = body_json(response).await;
        assert_eq!(body["detail"], "upstream said no URL=[http://upstream/x]");
    }

    #[tokio::test]
    async fn validation_errors_are_enumerated() {
        let err = AppError::validation(vec![FieldError::new("query -> limit", "must be at most 100")]);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["title"], "Validation Error");
        assert_eq!(body["validation_errors"][0]["parameter"], "query -> limit");
        assert_eq!(body["validation_errors"][0]["message"], "must be at most 100");
        assert!(body["validation_errors"][0]["type"].is_null());
    }

    #[test]
    fn lifecycle_failure_translates_to_not_initialized() {
        let err = translate_persistence_error(DbError::NotInitialized);
        assert_eq!(err.kind, ErrorKind::NotInitialized);
    }

    #[test]
    fn untranslated_lookup_failures_become_orm_errors() {
        let ctx = LookupContext {
            entity: "example",
            id: Uuid::nil(),
        };
        let err = translate_persistence_error(DbError::NoResultFound(ctx));
        assert_eq!(err.kind, ErrorKind::Orm);
        let err = translate_persistence_error(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        assert_eq!(err.kind, ErrorKind::Orm);
    }
}
