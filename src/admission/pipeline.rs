//! Ordered composition of the admission gates.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::admission::gate::{Admission, AdmissionRequest, Decision, Gate};
use crate::admission::gates::{AuthGate, ClientIdentityGate, CorsGate, RateLimitGate};
use crate::config::{GateConfig, ValidationError};
use crate::observability::metrics;
use crate::security::auth::{CredentialValidator, ProtectedScope};
use crate::security::client_ip::ClientIpResolver;
use crate::security::cors::CorsPolicy;
use crate::security::rate_limit::{RateLimitPolicy, SlidingWindowLimiter};

/// Result of running a request through every gate.
pub enum Verdict {
    /// All gates passed; the request may reach a handler.
    Admit(Admission),

    /// A gate answered the request itself.
    Halt {
        gate: &'static str,
        response: Response,
    },
}

/// The fixed gate chain: client identity → rate limit → CORS → auth.
pub struct AdmissionPipeline {
    gates: Vec<Box<dyn Gate>>,
}

impl AdmissionPipeline {
    /// Assemble the chain. Passing `None` for the rate limit removes that
    /// stage; the relative order of the others never changes.
    pub fn new(
        resolver: ClientIpResolver,
        rate_limit: Option<(Arc<SlidingWindowLimiter>, RateLimitPolicy)>,
        cors: CorsPolicy,
        scope: ProtectedScope,
        validator: Arc<dyn CredentialValidator>,
    ) -> Self {
        let mut gates: Vec<Box<dyn Gate>> = Vec::with_capacity(4);
        gates.push(Box::new(ClientIdentityGate::new(resolver)));
        if let Some((limiter, policy)) = rate_limit {
            gates.push(Box::new(RateLimitGate::new(limiter, policy)));
        }
        gates.push(Box::new(CorsGate::new(cors)));
        gates.push(Box::new(AuthGate::new(scope, validator)));
        Self { gates }
    }

    pub fn from_config(
        config: &GateConfig,
        limiter: Arc<SlidingWindowLimiter>,
        validator: Arc<dyn CredentialValidator>,
    ) -> Result<Self, ValidationError> {
        let rate_limit = config
            .rate_limit
            .enabled
            .then(|| (limiter, RateLimitPolicy::from_config(&config.rate_limit)));

        Ok(Self::new(
            ClientIpResolver::from_config(&config.proxy),
            rate_limit,
            CorsPolicy::from_config(&config.cors)?,
            ProtectedScope::new(config.auth.protected_prefix.clone()),
            validator,
        ))
    }

    /// Gate names in evaluation order.
    pub fn gate_names(&self) -> Vec<&'static str> {
        self.gates.iter().map(|g| g.name()).collect()
    }

    /// Run `request` through the gates, stopping at the first halt.
    ///
    /// Headers collected by earlier gates are applied to a halting response.
    pub fn evaluate(&self, request: &AdmissionRequest<'_>) -> Verdict {
        let mut admission = Admission::default();

        for gate in &self.gates {
            if let Decision::Halt(mut response) = gate.evaluate(request, &mut admission) {
                apply_headers(&mut response, &admission);
                metrics::record_admission(Some(gate.name()));
                return Verdict::Halt {
                    gate: gate.name(),
                    response,
                };
            }
        }

        metrics::record_admission(None);
        Verdict::Admit(admission)
    }
}

fn apply_headers(response: &mut Response, admission: &Admission) {
    let headers = response.headers_mut();
    for (name, value) in &admission.response_headers {
        headers.insert(name.clone(), value.clone());
    }
}

/// Axum middleware running the pipeline in front of every route.
///
/// Admitted requests carry the [`ClientKey`](crate::security::client_ip::ClientKey)
/// and, on protected routes, the
/// [`CallerIdentity`](crate::security::auth::CallerIdentity) in their extensions.
pub async fn admission_middleware(
    State(pipeline): State<Arc<AdmissionPipeline>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let verdict = pipeline.evaluate(&AdmissionRequest::from_request(peer, &request));

    let admission = match verdict {
        Verdict::Admit(admission) => admission,
        Verdict::Halt { response, .. } => return response,
    };

    if let Some(key) = admission.client_key.clone() {
        request.extensions_mut().insert(key);
    }
    if let Some(caller) = admission.caller.clone() {
        request.extensions_mut().insert(caller);
    }

    let mut response = next.run(request).await;
    apply_headers(&mut response, &admission);
    response
}
