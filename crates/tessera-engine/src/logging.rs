//! Structured logging setup.
//!
//! The engine only emits `tracing` events; binaries decide where they go.
//! [`init`] installs a `fmt` subscriber filtered by `RUST_LOG`, falling back
//! to `default_filter` when the variable is unset or invalid.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
