//! Outbound JSON client with transport-level retry and status-to-error mapping.

use crate::config::HttpSettings;
use crate::error::{AppError, ErrorKind};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Put => "PUT",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Delete => "DELETE",
        })
    }
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    host: Url,
    max_attempts: u32,
    time_sleep: Duration,
}

impl HttpClient {
    pub fn new(host: &str, settings: &HttpSettings) -> Result<Self, AppError> {
        let host = Url::parse(host).map_err(|e| AppError::internal(format!("invalid host {host}: {e}")))?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AppError::internal(e.to_string()))?;
        Ok(HttpClient {
            client,
            host,
            max_attempts: settings.max_attempts.max(1),
            time_sleep: settings.time_sleep,
        })
    }

    /// Send `data` to `path` (resolved against the host) and decode the JSON reply.
    ///
    /// GET sends `data` as query parameters; POST and PUT send it as the body.
    pub async fn request(&self, path: &str, method: RequestMethod, data: Option<&Value>) -> Result<Value, AppError> {
        let url = self
            .host
            .join(path)
            .map_err(|e| AppError::bad_request(format!("invalid path {path}: {e}")))?;
        let builder = match method {
            RequestMethod::Get => {
                let mut b = self.client.get(url.clone());
                if let Some(data) = data {
                    b = b.query(&query_pairs(data));
                }
                b
            }
            RequestMethod::Post => self.client.post(url.clone()).json(data.unwrap_or(&Value::Null)),
            RequestMethod::Put => self.client.put(url.clone()).json(data.unwrap_or(&Value::Null)),
            other => {
                return Err(AppError::new(ErrorKind::MethodNotAllowed, format!("Method {other} not allowed"))
                    .with_url(url.as_str()))
            }
        };

        let response = self.send_with_retry(builder).await?;
        let status = response.status();
        tracing::info!(url = %url, status = status.as_u16(), "request made");
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::new(status_kind(status), text).with_url(url.as_str()));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::new(ErrorKind::ModelValidation, e.to_string()).with_url(url.as_str()))
    }

    async fn send_with_retry(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AppError> {
        let mut attempt = 1;
        loop {
            let Some(request) = builder.try_clone() else {
                return Err(AppError::internal("request body cannot be retried"));
            };
            tracing::info!(attempt, "sending request");
            match request.send().await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    tracing::warn!(attempt, max_attempts = self.max_attempts, error = %err, "request failed");
                    if attempt >= self.max_attempts {
                        tracing::error!("all retry attempts failed");
                        return Err(AppError::new(ErrorKind::TooManyRequests, ""));
                    }
                    tracing::info!(delay_ms = self.time_sleep.as_millis() as u64, "retrying");
                    tokio::time::sleep(self.time_sleep).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn status_kind(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::BAD_REQUEST => ErrorKind::BadRequest,
        StatusCode::UNAUTHORIZED => ErrorKind::Unauthorized,
        StatusCode::FORBIDDEN => ErrorKind::Forbidden,
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::UnprocessableEntity,
        _ => ErrorKind::ServiceUnavailable,
    }
}

/// Flatten a JSON object into query pairs. Non-object data yields no pairs.
fn query_pairs(data: &Value) -> Vec<(String, String)> {
    let Some(obj) = data.as_object() else {
        return Vec::new();
    };
    obj.iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), v)
        })
        .collect()
}
