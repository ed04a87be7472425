//! API template: a CRUD REST service over PostgreSQL.
//!
//! Requests flow handler → service (wrapped by an [`OperationPipeline`]) → [`Repository`]
//! inside a [`Session`] owned by the [`DatabaseSessionManager`].

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod http_client;
pub mod metrics;
pub mod migration;
pub mod model;
pub mod openapi;
pub mod repository;
pub mod response;
pub mod routes;
pub mod service;
pub mod session;
pub mod sql;
pub mod state;
pub mod telemetry;

pub use config::{Settings, API_V1_STR};
pub use error::{AppError, ConfigError, DbError, ErrorKind, ServiceError};
pub use http_client::{HttpClient, RequestMethod};
pub use metrics::HttpMetrics;
pub use repository::{Entity, Repository};
pub use response::{Message, ProblemDetails};
pub use routes::app_router;
pub use service::{ExampleService, OperationPipeline};
pub use session::{DatabaseSessionManager, Session, SessionState};
pub use state::AppState;
