//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     register domains → readers + managers → Loader → start
//!
//! Shutdown (shutdown.rs):
//!     stop broadcast → in-flight cycles drain within grace → abort
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful shutdown
//!     SIGHUP → reset readers and trigger a refresh
//! ```
//!
//! # Design Decisions
//! - Managers are usable as soon as they are built; they return defaults
//!   until the first publish
//! - Shutdown has timeout: tasks still running after the grace are aborted

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use startup::{Application, DomainBuilder, Startup};
