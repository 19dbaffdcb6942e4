//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports distinct)
//! - Reject unknown log levels
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ConfigSnapshot → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::ConfigSnapshot;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.host must not be empty")]
    EmptyHost,

    #[error("server.port and server.metrics_port are both {0}")]
    PortCollision(u16),

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("unknown log level `{0}`")]
    UnknownLogLevel(String),

    #[error("environment must not be empty")]
    EmptyEnvironment,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ConfigSnapshot) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }

    // Port zero is ephemeral, so two zeros never collide.
    if config.server.port != 0 && config.server.port == config.server.metrics_port {
        errors.push(ValidationError::PortCollision(config.server.port));
    }

    let durations = [
        ("server.read_timeout_secs", config.server.read_timeout_secs),
        ("server.write_timeout_secs", config.server.write_timeout_secs),
        ("server.idle_timeout_secs", config.server.idle_timeout_secs),
        ("lifecycle.startup_timeout_secs", config.lifecycle.startup_timeout_secs),
        ("lifecycle.shutdown_grace_secs", config.lifecycle.shutdown_grace_secs),
    ];
    for (field, value) in durations {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration { field });
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.environment.trim().is_empty() {
        errors.push(ValidationError::EmptyEnvironment);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
