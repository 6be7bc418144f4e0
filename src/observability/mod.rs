//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handling and storage produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout (pretty in development, JSON in production)
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Request ID set on every request and echoed in the response
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
