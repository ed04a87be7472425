//! Response bodies shared by every route.

use crate::error::FieldError;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

/// Problem-details style error body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProblemDetails {
    pub title: String,
    #[schema(value_type = Object)]
    pub detail: Value,
    pub status: u16,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<FieldError>,
}

/// Plain `{"message": ...}` acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Message {
            message: message.into(),
        }
    }
}
