//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;

use admission_gate::config::{CredentialConfig, GateConfig};
use admission_gate::HttpServer;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, Response};
use axum::Router;
use tower::ServiceExt;

pub const TOKEN: &str = "test-token";
pub const CALLER: &str = "alice";

/// Defaults with a known credential and the idle sweeper off.
pub fn test_config() -> GateConfig {
    let mut config = GateConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.rate_limit.sweep_interval_secs = 0;
    config.auth.credentials.push(CredentialConfig {
        token: TOKEN.into(),
        caller: CALLER.into(),
    });
    config
}

pub fn router(config: GateConfig) -> Router {
    HttpServer::new(config).unwrap().router()
}

/// Request builder preloaded with the peer address the server would see.
pub struct TestRequest {
    peer: SocketAddr,
    builder: axum::http::request::Builder,
}

impl TestRequest {
    pub fn new(method: &str, uri: &str, peer: &str) -> Self {
        Self {
            peer: peer.parse().unwrap(),
            builder: Request::builder().method(method).uri(uri),
        }
    }

    pub fn get(uri: &str, peer: &str) -> Self {
        Self::new("GET", uri, peer)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("authorization", &format!("Bearer {token}"))
    }

    /// Send through `router` as if it arrived from the configured peer.
    ///
    /// Clones of one router share the limiter, so requests from different
    /// peers still land in the same rate-limit state.
    pub async fn send(self, router: &Router) -> Response<Body> {
        let peer = self.peer;
        let request = self.builder.body(Body::empty()).unwrap();
        router
            .clone()
            .layer(MockConnectInfo(peer))
            .oneshot(request)
            .await
            .unwrap()
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap()
        .to_vec()
}
