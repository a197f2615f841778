//! Request admission subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (peer address, method, path, headers)
//!     → ClientIdentityGate (resolve client IP behind trusted proxies)
//!     → RateLimitGate      (sliding window per client; 429 on excess)
//!     → CorsGate           (access-control headers; 204 on preflight)
//!     → AuthGate           (bearer token under the protected prefix; 401)
//!     → downstream handler
//! ```
//!
//! # Design Decisions
//! - The order is fixed by the pipeline constructor and cannot be changed
//! - Each gate returns an explicit continue/halt decision
//! - Headers gathered before a halt are kept on the halting response
//! - No gate fails the process; every outcome is an HTTP response

pub mod gate;
pub mod gates;
pub mod pipeline;

pub use gate::{Admission, AdmissionRequest, Decision, Gate};
pub use pipeline::{admission_middleware, AdmissionPipeline, Verdict};
