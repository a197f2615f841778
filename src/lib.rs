//! HTTP admission gate library.
//!
//! Every request passes client identity resolution, sliding-window rate
//! limiting, CORS and authentication, in that order, before a handler runs.

pub mod admission;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use admission::AdmissionPipeline;
pub use config::schema::GateConfig;
pub use error::Rejection;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::rate_limit::SlidingWindowLimiter;
