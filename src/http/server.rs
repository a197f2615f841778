//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the built-in handlers
//! - Wire up middleware (request ID, tracing, timeout, admission)
//! - Bind server to listener
//! - Run the idle-client sweeper alongside the server
//! - Drain in-flight requests on shutdown, within a bounded window

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admission::{admission_middleware, AdmissionPipeline};
use crate::config::{GateConfig, ValidationError};
use crate::http::handlers;
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::security::auth::{CredentialValidator, ProtectedScope, StaticCredentials};
use crate::security::rate_limit::{IdleSweeper, SlidingWindowLimiter};

/// HTTP server fronted by the admission pipeline.
pub struct HttpServer {
    router: Router,
    config: GateConfig,
    limiter: Arc<SlidingWindowLimiter>,
}

impl HttpServer {
    /// Create a server whose credentials come from `config.auth.credentials`.
    pub fn new(config: GateConfig) -> Result<Self, ValidationError> {
        let validator = Arc::new(StaticCredentials::from_config(&config.auth));
        Self::with_validator(config, validator)
    }

    /// Create a server backed by an external credential store.
    pub fn with_validator(
        config: GateConfig,
        validator: Arc<dyn CredentialValidator>,
    ) -> Result<Self, ValidationError> {
        let limiter = Arc::new(SlidingWindowLimiter::new());
        let pipeline = Arc::new(AdmissionPipeline::from_config(
            &config,
            limiter.clone(),
            validator,
        )?);

        tracing::debug!(gates = ?pipeline.gate_names(), "Admission pipeline assembled");

        let router = Self::build_router(&config, pipeline);
        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, pipeline: Arc<AdmissionPipeline>) -> Router {
        let protected = Router::new().route("/whoami", get(handlers::whoami));
        let scope = ProtectedScope::new(config.auth.protected_prefix.clone());

        let routes = Router::new().route("/health", get(handlers::health));
        let routes = if scope.prefix().is_empty() {
            routes.merge(protected)
        } else {
            routes.nest(scope.prefix(), protected)
        };

        routes
            .layer(middleware::from_fn_with_state(pipeline, admission_middleware))
            .layer(TimeoutLayer::new(config.listener.request_timeout()))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// The router, for serving on a custom transport or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared limiter state.
    pub fn limiter(&self) -> Arc<SlidingWindowLimiter> {
        self.limiter.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires, then drain for at most the
    /// configured grace period.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if self.config.rate_limit.enabled {
            if let Some(interval) = self.config.rate_limit.sweep_interval() {
                let sweeper = IdleSweeper::new(
                    self.limiter.clone(),
                    self.config.rate_limit.window(),
                    interval,
                );
                tokio::spawn(sweeper.run(shutdown.resubscribe()));
            }
        }

        let grace = self.config.listener.shutdown_grace();
        let mut drain_started = shutdown.resubscribe();

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining in-flight requests");
            })
            .into_future();

        let deadline = async move {
            let _ = drain_started.recv().await;
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            res = serve => res?,
            _ = deadline => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Shutdown grace period elapsed, abandoning in-flight requests"
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
