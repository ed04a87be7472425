//! Extract the caller identity from the `X-API-Key` header.

use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Key value that is recognised but always refused.
pub const FORBIDDEN_KEY: &str = "forbidden";

/// Subject derived from `X-API-Key`. Unset when the header is absent or not recognised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKey {
    pub sub: Option<String>,
}

impl ApiKey {
    /// Subject of an authorised caller; 401 without one, 403 for the refused key.
    pub fn require(&self) -> Result<&str, AppError> {
        match self.sub.as_deref() {
            None => Err(AppError::unauthorized()),
            Some(FORBIDDEN_KEY) => Err(AppError::forbidden()),
            Some(sub) => Ok(sub),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ApiKey
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let sub = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|key| *key == app.settings.auth.test_token || *key == FORBIDDEN_KEY)
            .map(String::from);
        Ok(ApiKey { sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn require_maps_subject_to_outcome() {
        let missing = ApiKey { sub: None };
        assert_eq!(missing.require().unwrap_err().kind, ErrorKind::Unauthorized);
        let refused = ApiKey {
            sub: Some(FORBIDDEN_KEY.into()),
        };
        assert_eq!(refused.require().unwrap_err().kind, ErrorKind::Forbidden);
        let ok = ApiKey {
            sub: Some("token".into()),
        };
        assert_eq!(ok.require().unwrap(), "token");
    }
}
