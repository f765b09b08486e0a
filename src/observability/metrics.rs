//! Metrics collection and exposition.
//!
//! # Metrics
//! - `validator_sections_total` (counter): section validations by section, outcome
//! - `validator_requests_total` (counter): stage invocations by outcome
//! - `validator_stage_duration_seconds` (histogram): stage latency by outcome

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::validation::Section;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_section(section: Section, valid: bool) {
    counter!(
        "validator_sections_total",
        "section" => section.as_str(),
        "outcome" => outcome(valid)
    )
    .increment(1);
}

pub fn record_stage(valid: bool, start: Instant) {
    let outcome = outcome(valid);
    counter!("validator_requests_total", "outcome" => outcome).increment(1);
    histogram!("validator_stage_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

fn outcome(valid: bool) -> &'static str {
    if valid {
        "valid"
    } else {
        "rejected"
    }
}
