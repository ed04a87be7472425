//! Router assembly.

pub mod common;
pub mod example;

pub use common::common_routes;
pub use example::example_routes;

use crate::config::API_V1_STR;
use crate::metrics::track_metrics;
use crate::state::AppState;
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Full application router: common routes at the root, entity routes under `/api/v1`.
/// Request metrics cover matched routes only.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(common_routes())
        .nest(API_V1_STR, example_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
