//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the admission gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address, deadlines).
    pub listener: ListenerConfig,

    /// Sliding-window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Trusted proxies and forwarded-IP headers.
    pub proxy: ProxyConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Protected routes and credentials.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// How long in-flight requests may drain after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

impl ListenerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum admitted requests per client within one window.
    pub limit: usize,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Interval of the idle-client sweep in seconds (0 disables it).
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 100,
            window_secs: 60,
            sweep_interval_secs: 300,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

/// Trusted proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// CIDR ranges whose forwarded-IP headers are believed.
    pub trusted_cidrs: Vec<String>,

    /// Forwarded-IP headers, highest priority first.
    pub client_ip_headers: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            trusted_cidrs: [
                // Private networks
                "10.0.0.0/8",
                "172.16.0.0/12",
                "192.168.0.0/16",
                // Cloudflare edge
                "173.245.48.0/20",
                "103.21.244.0/22",
                "103.22.200.0/22",
                "103.31.4.0/22",
                "141.101.64.0/18",
                "108.162.192.0/18",
                "190.93.240.0/20",
                "188.114.96.0/20",
                "197.234.240.0/22",
                "198.41.128.0/17",
                "162.158.0.0/15",
                "104.16.0.0/13",
                "104.24.0.0/14",
                "172.64.0.0/13",
                "131.0.72.0/22",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            client_ip_headers: vec![
                "CF-Connecting-IP".to_string(),
                "X-Forwarded-For".to_string(),
            ],
        }
    }
}

/// Cross-origin resource sharing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins echoed back in `Access-Control-Allow-Origin` (exact match).
    pub allowed_origins: Vec<String>,

    /// Value of `Access-Control-Allow-Methods`.
    pub allow_methods: String,

    /// Value of `Access-Control-Allow-Headers`.
    pub allow_headers: String,

    /// Method answered as a preflight.
    pub preflight_method: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "https://enkinvsh.github.io".to_string(),
                "https://web.telegram.org".to_string(),
                "https://t.me".to_string(),
            ],
            allow_methods: "GET, POST, PATCH, DELETE, OPTIONS".to_string(),
            allow_headers: "Content-Type, Authorization".to_string(),
            preflight_method: "OPTIONS".to_string(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Path prefix of the routes that require a credential.
    pub protected_prefix: String,

    /// Bearer tokens accepted by the built-in validator.
    pub credentials: Vec<CredentialConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            protected_prefix: "/api/v1".to_string(),
            credentials: Vec::new(),
        }
    }
}

/// A single static bearer token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialConfig {
    /// The bearer token.
    pub token: String,

    /// Caller identity attached to requests presenting this token.
    pub caller: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: GateConfig = toml::from_str(
            r#"
            [rate_limit]
            limit = 5

            [cors]
            allowed_origins = ["https://app.example"]
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.limit, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.cors.allowed_origins, vec!["https://app.example"]);
        assert_eq!(config.cors.preflight_method, "OPTIONS");
        assert_eq!(config.proxy.client_ip_headers[0], "CF-Connecting-IP");
        assert_eq!(config.listener.shutdown_grace(), Duration::from_secs(10));
    }

    #[test]
    fn test_credentials_table() {
        let config: GateConfig = toml::from_str(
            r#"
            [auth]
            protected_prefix = "/private"

            [[auth.credentials]]
            token = "t1"
            caller = "alice"
            "#,
        )
        .unwrap();

        assert_eq!(config.auth.protected_prefix, "/private");
        assert_eq!(config.auth.credentials.len(), 1);
        assert_eq!(config.auth.credentials[0].caller, "alice");
    }

    #[test]
    fn test_sweep_interval_zero_disables() {
        let mut config = RateLimitConfig::default();
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(300)));
        config.sweep_interval_secs = 0;
        assert_eq!(config.sweep_interval(), None);
    }
}
