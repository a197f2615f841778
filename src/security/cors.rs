//! Cross-origin policy.
//!
//! # Design Decisions
//! - Origins match exactly and case-sensitively; the matched origin is echoed,
//!   never `*`
//! - A non-matching origin only withholds the allow-origin header; the request
//!   itself is not rejected
//! - Allow-methods and allow-headers are sent on every response

use std::collections::HashSet;

use axum::http::{header, HeaderMap, HeaderValue, Method};

use crate::config::{CorsConfig, ValidationError};

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: HashSet<String>,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    preflight_method: Method,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Result<Self, ValidationError> {
        let allow_methods = HeaderValue::from_str(&config.allow_methods).map_err(|_| {
            ValidationError::CorsHeaderValue {
                field: "allow_methods",
                value: config.allow_methods.clone(),
            }
        })?;
        let allow_headers = HeaderValue::from_str(&config.allow_headers).map_err(|_| {
            ValidationError::CorsHeaderValue {
                field: "allow_headers",
                value: config.allow_headers.clone(),
            }
        })?;
        let preflight_method = Method::from_bytes(config.preflight_method.as_bytes())
            .map_err(|_| ValidationError::PreflightMethod(config.preflight_method.clone()))?;

        Ok(Self {
            allowed_origins: config.allowed_origins.iter().cloned().collect(),
            allow_methods,
            allow_headers,
            preflight_method,
        })
    }

    /// The origin to echo back, if `origin` is allowed.
    pub fn matched_origin<'a>(&self, origin: Option<&'a HeaderValue>) -> Option<&'a HeaderValue> {
        origin.filter(|value| {
            value
                .to_str()
                .is_ok_and(|s| self.allowed_origins.contains(s))
        })
    }

    /// Access-control headers for a request carrying `origin`.
    pub fn response_headers(&self, origin: Option<&HeaderValue>) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(3);
        if let Some(origin) = self.matched_origin(origin) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        headers
    }

    pub fn is_preflight(&self, method: &Method) -> bool {
        *method == self.preflight_method
    }
}
