//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_admissions_total` (counter): admission outcomes, labelled by
//!   `outcome` (`admitted`, `rate_limited`, `preflight`, `unauthorized`)
//! - `gate_rate_limited_total` (counter): requests rejected with 429
//! - `gate_tracked_clients` (gauge): keys held by the limiter after a sweep
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Prometheus exporter runs on its own listener

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Outcome label for a request halted by the gate named `halted_by`, or
/// admitted when `None`.
pub fn admission_outcome(halted_by: Option<&str>) -> &'static str {
    match halted_by {
        None => "admitted",
        Some("rate_limit") => "rate_limited",
        Some("cors") => "preflight",
        Some("auth") => "unauthorized",
        Some(_) => "halted",
    }
}

pub fn record_admission(halted_by: Option<&str>) {
    let outcome = admission_outcome(halted_by);
    ::metrics::counter!("gate_admissions_total", "outcome" => outcome).increment(1);
    if outcome == "rate_limited" {
        ::metrics::counter!("gate_rate_limited_total").increment(1);
    }
}

pub fn record_tracked_clients(count: usize) {
    ::metrics::gauge!("gate_tracked_clients").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_outcome_labels() {
        assert_eq!(admission_outcome(None), "admitted");
        assert_eq!(admission_outcome(Some("rate_limit")), "rate_limited");
        assert_eq!(admission_outcome(Some("cors")), "preflight");
        assert_eq!(admission_outcome(Some("auth")), "unauthorized");
        assert_eq!(admission_outcome(Some("client_identity")), "halted");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_admission(Some("rate_limit"));
        record_admission(None);
        record_tracked_clients(3);
    }
}
