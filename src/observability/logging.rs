//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Pick the output format for the environment
//!
//! # Design Decisions
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured level when set

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{ConfigSnapshot, LogFormat};

/// Resolve `Auto` against the environment.
pub fn effective_format(config: &ConfigSnapshot) -> LogFormat {
    match config.observability.log_format {
        LogFormat::Auto if config.is_production() => LogFormat::Json,
        LogFormat::Auto => LogFormat::Pretty,
        explicit => explicit,
    }
}

/// Filter used when `RUST_LOG` is unset. `debug` lifts this crate's own
/// events to debug level regardless of `log_level`.
fn default_directive(config: &ConfigSnapshot) -> String {
    let level = config.observability.log_level.to_ascii_lowercase();
    let own = if config.debug { "debug" } else { level.as_str() };
    format!("novatra_api={own},tower_http={level},warn")
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &ConfigSnapshot) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    let registry = tracing_subscriber::registry().with(filter);

    match effective_format(config) {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
}
