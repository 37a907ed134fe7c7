//! Tracing setup shared by the factory binaries.
//!
//! `RUST_LOG` wins when set. Otherwise the configured level applies, so
//! `botforge.toml` and `BOTFORGE_LOG_LEVEL` control verbosity without touching
//! the environment filter syntax.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor a configured level is usable.
pub const FALLBACK_LEVEL: &str = "info";

/// Build the filter: `RUST_LOG`, then `default_level`, then [`FALLBACK_LEVEL`].
pub fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL))
}

/// Initialize tracing to stderr in compact format.
///
/// Safe to call more than once; later calls are ignored.
///
/// # Example
/// ```bash
/// RUST_LOG=botforge=debug botforge forge spec.json
/// ```
pub fn init(default_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(filter(default_level))
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
