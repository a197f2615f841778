//! Security subsystem.
//!
//! # Components
//! ```text
//! client_ip.rs  → who is this client (trusted-proxy aware)
//! rate_limit.rs → how often has this client been admitted recently
//! cors.rs       → which origins may read the response
//! auth.rs       → who is the caller on protected routes
//! ```
//!
//! # Design Decisions
//! - No trust in client input: forwarded headers only from trusted proxies
//! - Malformed headers degrade to "no match", never to an error
//! - Components are plain values; the admission pipeline wires them together

pub mod auth;
pub mod client_ip;
pub mod cors;
pub mod rate_limit;
