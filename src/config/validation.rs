//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window > 0, addresses parse)
//! - Check that header names, header values and methods are well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue, Method};
use ipnet::IpNet;
use thiserror::Error;

use crate::config::schema::GateConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("rate_limit.window_secs must be greater than zero")]
    ZeroWindow,

    #[error("proxy.trusted_cidrs entry `{0}` is not a CIDR range")]
    TrustedCidr(String),

    #[error("proxy.client_ip_headers entry `{0}` is not a header name")]
    ClientIpHeader(String),

    #[error("cors.allowed_origins entry `{0}` is not a valid header value")]
    Origin(String),

    #[error("cors.{field} `{value}` is not a valid header value")]
    CorsHeaderValue { field: &'static str, value: String },

    #[error("cors.preflight_method `{0}` is not an HTTP method")]
    PreflightMethod(String),

    #[error("auth.protected_prefix `{0}` must start with `/`")]
    ProtectedPrefix(String),

    #[error("auth.credentials entry for `{0}` has an empty token")]
    EmptyToken(String),

    #[error("auth.credentials token for `{0}` is already assigned")]
    DuplicateToken(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroWindow);
    }

    for cidr in &config.proxy.trusted_cidrs {
        if parse_trusted_range(cidr).is_none() {
            errors.push(ValidationError::TrustedCidr(cidr.clone()));
        }
    }

    for name in &config.proxy.client_ip_headers {
        if HeaderName::try_from(name.as_str()).is_err() {
            errors.push(ValidationError::ClientIpHeader(name.clone()));
        }
    }

    for origin in &config.cors.allowed_origins {
        if HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::Origin(origin.clone()));
        }
    }

    for (field, value) in [
        ("allow_methods", &config.cors.allow_methods),
        ("allow_headers", &config.cors.allow_headers),
    ] {
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::CorsHeaderValue {
                field,
                value: value.clone(),
            });
        }
    }

    if Method::from_bytes(config.cors.preflight_method.as_bytes()).is_err() {
        errors.push(ValidationError::PreflightMethod(config.cors.preflight_method.clone()));
    }

    if !config.auth.protected_prefix.starts_with('/') {
        errors.push(ValidationError::ProtectedPrefix(config.auth.protected_prefix.clone()));
    }

    let mut seen = HashSet::new();
    for cred in &config.auth.credentials {
        if cred.token.is_empty() {
            errors.push(ValidationError::EmptyToken(cred.caller.clone()));
        } else if !seen.insert(cred.token.as_str()) {
            errors.push(ValidationError::DuplicateToken(cred.caller.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse a trusted range; a bare address is treated as a single-host range.
pub fn parse_trusted_range(s: &str) -> Option<IpNet> {
    let s = s.trim();
    s.parse::<IpNet>()
        .ok()
        .or_else(|| s.parse::<std::net::IpAddr>().ok().map(IpNet::from))
}
