//! Example CRUD handlers: list, read, create, delete.

use crate::error::{AppError, FieldError};
use crate::model::{CreateExampleBody, ExampleResponse};
use crate::response::{Message, ProblemDetails};
use crate::service::validation::{validate_example_query, validate_new_example, validate_uuid};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;

fn body_rejection(rejection: JsonRejection) -> AppError {
    AppError::validation(vec![FieldError {
        parameter: Some("body".into()),
        message: Some(rejection.body_text()),
        kind: Some("json_invalid".into()),
    }])
}

/// Returns a list of examples.
#[utoipa::path(
    get,
    path = "/api/v1/example/",
    tag = "Example",
    params(
        ("example_date" = Option<String>, Query, description = "Only examples on or after this date (YYYY-MM-DD)"),
        ("example_status" = Option<String>, Query, description = "Status of example, default A"),
        ("sort_order" = Option<String>, Query, description = "asc or desc, default asc"),
        ("sort_key" = Option<String>, Query, description = "Field used for sorting, default example_status"),
        ("skip" = Option<i64>, Query, description = "Number of items to skip (0..=1000000)"),
        ("limit" = Option<i64>, Query, description = "Maximum number of items (0..=100, default 20)")
    ),
    responses(
        (status = 200, description = "List of all examples", body = Vec<ExampleResponse>),
        (status = 422, description = "Validation Error", body = ProblemDetails),
        (status = 500, description = "Internal error", body = ProblemDetails)
    )
)]
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<ExampleResponse>>, AppError> {
    let query = validate_example_query(&params)?;
    let service = state.examples.clone();
    let rows = state
        .sessions
        .session(move |session| async move { service.get_examples(session, query).await }.boxed())
        .await?;
    Ok(Json(rows))
}

/// Returns one example.
#[utoipa::path(
    get,
    path = "/api/v1/example/{example_id}",
    tag = "Example",
    params(("example_id" = uuid::Uuid, Path, description = "Example id")),
    responses(
        (status = 200, description = "Example by Id", body = ExampleResponse),
        (status = 404, description = "Not found", body = ProblemDetails),
        (status = 422, description = "Validation Error", body = ProblemDetails)
    )
)]
pub async fn read(
    State(state): State<AppState>,
    Path(example_id): Path<String>,
) -> Result<Json<ExampleResponse>, AppError> {
    let id = validate_uuid("example_id", &example_id)?;
    let service = state.examples.clone();
    let example = state
        .sessions
        .session(move |session| async move { service.get_example_by_id(session, id).await }.boxed())
        .await?;
    Ok(Json(example))
}

/// Creates an example.
#[utoipa::path(
    post,
    path = "/api/v1/example/",
    tag = "Example",
    request_body = CreateExampleBody,
    responses(
        (status = 200, description = "Created example", body = ExampleResponse),
        (status = 409, description = "Conflict", body = ProblemDetails),
        (status = 422, description = "Validation Error", body = ProblemDetails)
    )
)]
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ExampleResponse>, AppError> {
    let Json(body) = body.map_err(body_rejection)?;
    let input = validate_new_example(&body)?;
    let service = state.examples.clone();
    let example = state
        .sessions
        .session(move |session| async move { service.create(session, input).await }.boxed())
        .await?;
    Ok(Json(example))
}

/// Deletes an example. Deleting an unknown id succeeds.
#[utoipa::path(
    delete,
    path = "/api/v1/example/{example_id}",
    tag = "Example",
    params(("example_id" = uuid::Uuid, Path, description = "Example id")),
    responses(
        (status = 200, description = "Example deleted", body = Message),
        (status = 422, description = "Validation Error", body = ProblemDetails)
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    Path(example_id): Path<String>,
) -> Result<Json<Message>, AppError> {
    let id = validate_uuid("example_id", &example_id)?;
    let service = state.examples.clone();
    state
        .sessions
        .session(move |session| async move { service.delete(session, id).await }.boxed())
        .await?;
    Ok(Json(Message::new("Example deleted successfully")))
}
