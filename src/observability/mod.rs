//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt subscriber, filtered by RUST_LOG or config)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through logs via the TraceLayer span
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
