//! Shared application state for all routes.

use crate::config::Settings;
use crate::metrics::HttpMetrics;
use crate::service::ExampleService;
use crate::session::DatabaseSessionManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Initialised before the router is built and closed after it stops serving.
    pub sessions: Arc<DatabaseSessionManager>,
    pub settings: Arc<Settings>,
    pub examples: Arc<ExampleService>,
    pub metrics: Arc<HttpMetrics>,
}

impl AppState {
    /// # Errors
    ///
    /// Fails only if the request metrics cannot be registered.
    pub fn new(settings: Settings, sessions: Arc<DatabaseSessionManager>) -> Result<Self, prometheus::Error> {
        let examples = ExampleService::new(settings.database.schema.clone());
        Ok(AppState {
            sessions,
            settings: Arc::new(settings),
            examples: Arc::new(examples),
            metrics: Arc::new(HttpMetrics::new()?),
        })
    }
}
