//! Gate abstraction shared by every admission stage.

use std::net::SocketAddr;

use axum::http::{HeaderMap, Method, Request};
use axum::response::Response;

use crate::security::auth::CallerIdentity;
use crate::security::client_ip::ClientKey;

/// Read-only view of the parts of a request the gates look at.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionRequest<'a> {
    pub peer: SocketAddr,
    pub method: &'a Method,
    pub path: &'a str,
    pub headers: &'a HeaderMap,
}

impl<'a> AdmissionRequest<'a> {
    pub fn from_request<B>(peer: SocketAddr, request: &'a Request<B>) -> Self {
        Self {
            peer,
            method: request.method(),
            path: request.uri().path(),
            headers: request.headers(),
        }
    }
}

/// What the gates have learned about a request so far.
#[derive(Debug, Clone, Default)]
pub struct Admission {
    /// Resolved rate-limit key.
    pub client_key: Option<ClientKey>,

    /// Authenticated caller, on protected routes.
    pub caller: Option<CallerIdentity>,

    /// Headers to add to whatever response the request ends up with.
    pub response_headers: HeaderMap,
}

/// Outcome of a single gate.
pub enum Decision {
    /// Hand the request to the next gate.
    Continue,

    /// Stop here and answer with this response.
    Halt(Response),
}

/// One stage of the admission pipeline.
pub trait Gate: Send + Sync {
    /// Stable name used in logs and metrics.
    fn name(&self) -> &'static str;

    fn evaluate(&self, request: &AdmissionRequest<'_>, admission: &mut Admission) -> Decision;
}
