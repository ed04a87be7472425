//! Example CRUD routes. Mounted under the API version prefix.

use crate::handlers::example::{create, delete as delete_handler, list, read};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn example_routes() -> Router<AppState> {
    Router::new()
        .route("/example/", get(list).post(create))
        .route("/example", get(list).post(create))
        .route("/example/:example_id", get(read).delete(delete_handler))
}
