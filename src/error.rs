//! Request rejections produced by the admission pipeline.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::security::auth::AuthError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("rate limit exceeded")]
    RateExceeded,

    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),
}

impl Rejection {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::RateExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Client-facing message; never carries limiter or credential internals.
    pub fn message(&self) -> String {
        match self {
            Self::RateExceeded => "rate limit exceeded".to_string(),
            Self::Unauthorized(e) => e.to_string(),
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_exceeded_body() {
        let response = Rejection::RateExceeded.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "rate limit exceeded" }));
    }

    #[tokio::test]
    async fn test_unauthorized_body() {
        let response = Rejection::from(AuthError::Missing).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "missing credentials");
    }
}
