//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! validation stage + server produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (section outcomes, stage latency)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Section name and outcome are labels, never the rejected payload
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
