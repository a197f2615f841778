//! Client identity resolution.
//!
//! # Responsibilities
//! - Derive the rate-limit key (client IP) for a request
//! - Believe forwarded-IP headers only from trusted proxy ranges
//!
//! # Design Decisions
//! - Headers from untrusted peers are ignored entirely (no spoofing bypass)
//! - Headers are consulted in configured priority order
//! - Hop lists are read right to left, skipping trusted proxies, so entries
//!   the client wrote itself never win
//! - Resolution never fails; the peer address is the fallback

use std::fmt;
use std::net::IpAddr;

use axum::http::{HeaderMap, HeaderName};
use ipnet::IpNet;

use crate::config::validation::parse_trusted_range;
use crate::config::ProxyConfig;

/// Identifier the rate limiter partitions state by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<IpAddr> for ClientKey {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves the client IP of a request behind zero or more trusted proxies.
#[derive(Debug, Clone)]
pub struct ClientIpResolver {
    trusted: Vec<IpNet>,
    headers: Vec<HeaderName>,
}

impl ClientIpResolver {
    pub fn new(trusted: Vec<IpNet>, headers: Vec<HeaderName>) -> Self {
        Self { trusted, headers }
    }

    /// Build from configuration. Entries that fail to parse are skipped;
    /// validation reports them before this point.
    pub fn from_config(config: &ProxyConfig) -> Self {
        let trusted = config
            .trusted_cidrs
            .iter()
            .filter_map(|s| parse_trusted_range(s))
            .collect();
        let headers = config
            .client_ip_headers
            .iter()
            .filter_map(|h| HeaderName::try_from(h.as_str()).ok())
            .collect();
        Self::new(trusted, headers)
    }

    /// Whether `ip` lies inside a trusted proxy range.
    pub fn is_trusted(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        self.trusted.iter().any(|net| net.contains(&ip))
    }

    /// Resolve the client address for a request from `peer`.
    pub fn resolve_ip(&self, peer: IpAddr, headers: &HeaderMap) -> IpAddr {
        let peer = peer.to_canonical();
        if !self.is_trusted(peer) {
            return peer;
        }

        self.headers
            .iter()
            .filter_map(|name| headers.get(name))
            .filter_map(|value| value.to_str().ok())
            .filter(|value| !value.trim().is_empty())
            .find_map(|value| self.client_from_chain(value))
            .unwrap_or(peer)
    }

    /// Resolve the rate-limit key for a request from `peer`.
    pub fn resolve(&self, peer: IpAddr, headers: &HeaderMap) -> ClientKey {
        ClientKey::from(self.resolve_ip(peer, headers))
    }

    /// Client address from a comma-separated hop list.
    ///
    /// Proxies append, so the list is walked from the right: trusted hops are
    /// skipped and the first untrusted address is the client. When every hop
    /// is trusted the leftmost one wins. An unparseable hop invalidates the
    /// whole header.
    fn client_from_chain(&self, value: &str) -> Option<IpAddr> {
        let mut leftmost = None;
        for hop in value.rsplit(',').map(str::trim) {
            let ip = hop.parse::<IpAddr>().ok()?.to_canonical();
            if !self.is_trusted(ip) {
                return Some(ip);
            }
            leftmost = Some(ip);
        }
        leftmost
    }
}
