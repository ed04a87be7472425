//! Prometheus request metrics, rendered at `GET /metrics`.
//!
//! Every matched route is counted by method, handler template and status
//! class, and its latency observed in a histogram. Unmatched paths are not
//! recorded so arbitrary URLs cannot grow the label set.

use crate::state::AppState;
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Instant;

/// Content type of the text exposition format.
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// HTTP metrics registered with their own registry.
///
/// - `http_requests_total` (counter): `method`, `handler`, `status` (`2xx`, `4xx`, ...)
/// - `http_request_duration_seconds` (histogram): `method`, `handler`
pub struct HttpMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
}

impl HttpMetrics {
    /// # Errors
    ///
    /// Returns an error if a metric cannot be registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests by method, handler and status"),
            &["method", "handler", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency by method and handler"),
            &["method", "handler"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;
        Ok(HttpMetrics {
            registry,
            requests_total,
            request_duration,
        })
    }

    pub fn observe(&self, method: &str, handler: &str, status: u16, seconds: f64) {
        let class = status_class(status);
        self.requests_total
            .with_label_values(&[method, handler, class.as_str()])
            .inc();
        self.request_duration
            .with_label_values(&[method, handler])
            .observe(seconds);
    }

    /// Text exposition of everything gathered so far.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

fn status_class(status: u16) -> String {
    format!("{}xx", status / 100)
}

/// Middleware recording one observation per matched request.
pub async fn track_metrics(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let handler = match request.extensions().get::<MatchedPath>() {
        Some(path) => path.as_str().to_owned(),
        None => return next.run(request).await,
    };
    let method = request.method().as_str().to_owned();
    let start = Instant::now();
    let response = next.run(request).await;
    state.metrics.observe(
        &method,
        &handler,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}
