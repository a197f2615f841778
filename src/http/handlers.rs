//! Built-in routes.
//!
//! Downstream business handlers live outside this crate; these two exist so a
//! deployment can check liveness and verify its credentials end to end.

use axum::{Extension, Json};
use serde::Serialize;

use crate::security::auth::CallerIdentity;
use crate::security::client_ip::ClientKey;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub caller: String,
    pub client: String,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

/// Echo the identity the admission pipeline attached to the request.
pub async fn whoami(
    Extension(caller): Extension<CallerIdentity>,
    Extension(client): Extension<ClientKey>,
) -> Json<WhoAmI> {
    Json(WhoAmI {
        caller: caller.id,
        client: client.to_string(),
    })
}
