//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, peer address capture)
//!     → request.rs (request ID)
//!     → admission pipeline (identity, rate limit, CORS, auth)
//!     → handlers.rs or downstream routes
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
