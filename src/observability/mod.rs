//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! coordinator / poller / admin API produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms, gauges)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every admin request carries an `x-request-id` that appears in its trace span
//! - Metric updates are no-ops until an exporter is installed, so tests need no setup

pub mod logging;
pub mod metrics;
