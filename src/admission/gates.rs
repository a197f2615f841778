//! The four admission stages.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::admission::gate::{Admission, AdmissionRequest, Decision, Gate};
use crate::error::Rejection;
use crate::security::auth::{bearer_token, CredentialValidator, ProtectedScope};
use crate::security::client_ip::{ClientIpResolver, ClientKey};
use crate::security::cors::CorsPolicy;
use crate::security::rate_limit::{RateLimitPolicy, SlidingWindowLimiter};

/// Resolves the client key. Never halts.
pub struct ClientIdentityGate {
    resolver: ClientIpResolver,
}

impl ClientIdentityGate {
    pub fn new(resolver: ClientIpResolver) -> Self {
        Self { resolver }
    }
}

impl Gate for ClientIdentityGate {
    fn name(&self) -> &'static str {
        "client_identity"
    }

    fn evaluate(&self, request: &AdmissionRequest<'_>, admission: &mut Admission) -> Decision {
        admission.client_key = Some(self.resolver.resolve(request.peer.ip(), request.headers));
        Decision::Continue
    }
}

/// Rejects clients over their sliding-window budget with 429.
pub struct RateLimitGate {
    limiter: Arc<SlidingWindowLimiter>,
    policy: RateLimitPolicy,
}

impl RateLimitGate {
    pub fn new(limiter: Arc<SlidingWindowLimiter>, policy: RateLimitPolicy) -> Self {
        Self { limiter, policy }
    }
}

impl Gate for RateLimitGate {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn evaluate(&self, request: &AdmissionRequest<'_>, admission: &mut Admission) -> Decision {
        let key = admission
            .client_key
            .get_or_insert_with(|| ClientKey::from(request.peer.ip()));

        if self.limiter.allow(key, self.policy.limit, self.policy.window) {
            Decision::Continue
        } else {
            tracing::debug!(client = %key, path = request.path, "Rate limit exceeded");
            Decision::Halt(Rejection::RateExceeded.into_response())
        }
    }
}

/// Adds access-control headers and answers preflights with 204.
pub struct CorsGate {
    policy: CorsPolicy,
}

impl CorsGate {
    pub fn new(policy: CorsPolicy) -> Self {
        Self { policy }
    }
}

impl Gate for CorsGate {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn evaluate(&self, request: &AdmissionRequest<'_>, admission: &mut Admission) -> Decision {
        let origin = request.headers.get(header::ORIGIN);
        for (name, value) in &self.policy.response_headers(origin) {
            admission.response_headers.insert(name.clone(), value.clone());
        }

        if self.policy.is_preflight(request.method) {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::NO_CONTENT;
            return Decision::Halt(response);
        }
        Decision::Continue
    }
}

/// Requires a valid bearer token under the protected prefix.
pub struct AuthGate {
    scope: ProtectedScope,
    validator: Arc<dyn CredentialValidator>,
}

impl AuthGate {
    pub fn new(scope: ProtectedScope, validator: Arc<dyn CredentialValidator>) -> Self {
        Self { scope, validator }
    }
}

impl Gate for AuthGate {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn evaluate(&self, request: &AdmissionRequest<'_>, admission: &mut Admission) -> Decision {
        if !self.scope.contains(request.path) {
            return Decision::Continue;
        }

        match bearer_token(request.headers).and_then(|token| self.validator.validate(token)) {
            Ok(caller) => {
                admission.caller = Some(caller);
                Decision::Continue
            }
            Err(e) => {
                tracing::debug!(
                    client = ?admission.client_key,
                    path = request.path,
                    reason = %e,
                    "Authentication failed"
                );
                Decision::Halt(Rejection::Unauthorized(e).into_response())
            }
        }
    }
}
