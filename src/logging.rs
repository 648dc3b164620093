//! Process-wide `tracing` subscriber setup.
//!
//! The level comes from `RUST_LOG` and defaults to `info`. Both functions
//! may only be called once per process.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Human-readable output.
///
/// ```no_run
/// outbox_relay::logging::init();
/// tracing::info!("relay started");
/// ```
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true).with_thread_names(true))
        .init();
}

/// JSON lines, for log aggregation.
pub fn init_json() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_target(true).with_thread_names(true))
        .init();
}

/// Like [`init`], but returns `false` instead of panicking when a global
/// subscriber is already installed. Handy in tests.
pub fn try_init() -> bool {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_test_writer())
        .try_init()
        .is_ok()
}
