//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! readers, loader and fetchers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters via the metrics facade)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Counters that tests and callers read back live as atomics next to the
//!   code that owns them; every increment is mirrored here
//! - Without an installed recorder the facade calls are no-ops

pub mod logging;
pub mod metrics;
