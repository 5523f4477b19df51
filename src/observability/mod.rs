//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → tracer.rs (request spans, when enabled)
//!
//! Consumers:
//!     → stdout (JSON in production, human-readable elsewhere)
//!     → Metrics endpoint (Prometheus scrape, when enabled)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through every access log line
//! - Metrics are cheap no-ops until a recorder is installed
//! - Tracing is optional; when disabled it adds nothing to the chain

pub mod logging;
pub mod metrics;
pub mod tracer;
