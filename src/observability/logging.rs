//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level when it is set and valid.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed, which happens
/// when tests or an embedding application got there first.
pub fn init_tracing(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(format!("flagtree={level}")).unwrap_or_else(|_| EnvFilter::new("flagtree=info"))
}
