//! Caller authentication for protected routes.
//!
//! Credential checking is delegated to a [`CredentialValidator`]; this module
//! only extracts the bearer token and decides which paths need one.

use std::collections::HashMap;

use axum::http::{header, HeaderMap};
use thiserror::Error;

use crate::config::AuthConfig;

/// Identity of an authenticated caller, attached to request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub id: String,
}

impl CallerIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Why a credential was refused. Messages are safe to show to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing credentials")]
    Missing,

    #[error("malformed credentials")]
    Malformed,

    #[error("invalid credentials")]
    Invalid,
}

/// External credential store.
pub trait CredentialValidator: Send + Sync {
    fn validate(&self, credential: &str) -> Result<CallerIdentity, AuthError>;
}

/// Validator backed by a fixed token table.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    tokens: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new<I, T, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (T, C)>,
        T: Into<String>,
        C: Into<String>,
    {
        Self {
            tokens: entries
                .into_iter()
                .map(|(t, c)| (t.into(), c.into()))
                .collect(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config
                .credentials
                .iter()
                .map(|c| (c.token.clone(), c.caller.clone())),
        )
    }
}

impl CredentialValidator for StaticCredentials {
    fn validate(&self, credential: &str) -> Result<CallerIdentity, AuthError> {
        self.tokens
            .get(credential)
            .map(CallerIdentity::new)
            .ok_or(AuthError::Invalid)
    }
}

/// Extract the bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::Missing)?
        .to_str()
        .map_err(|_| AuthError::Malformed)?;

    let (scheme, token) = value.trim().split_once(' ').ok_or(AuthError::Malformed)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Malformed);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Malformed);
    }
    Ok(token)
}

/// Set of routes that require a credential.
#[derive(Debug, Clone)]
pub struct ProtectedScope {
    prefix: String,
}

impl ProtectedScope {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let prefix = prefix.trim_end_matches('/');
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Matches the prefix itself and anything below it, on segment boundaries.
    pub fn contains(&self, path: &str) -> bool {
        if self.prefix.is_empty() {
            return true;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}
