//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration, resolved once at startup.
///
/// Shared as `Arc<ConfigSnapshot>`; nothing mutates it after loading.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigSnapshot {
    /// Listener configuration (host, ports, connection timeouts).
    pub server: ServerConfig,

    /// Startup and shutdown budgets.
    pub lifecycle: LifecycleConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Deployment environment tag ("development", "staging", "production").
    pub environment: String,

    /// Service version reported by the info endpoints.
    pub version: String,

    /// Log this crate's own events at debug level.
    pub debug: bool,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            lifecycle: LifecycleConfig::default(),
            observability: ObservabilityConfig::default(),
            environment: "development".to_string(),
            version: "1.0.0".to_string(),
            debug: true,
        }
    }
}

impl ConfigSnapshot {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Bind address of the primary listener, e.g. "0.0.0.0:8080".
    pub fn primary_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Bind address of the metrics listener, e.g. "0.0.0.0:9090".
    pub fn metrics_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.metrics_port)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface both listeners bind to.
    pub host: String,

    /// Primary API port. Zero asks the OS for an ephemeral port.
    pub port: u16,

    /// Prometheus scrape port.
    pub metrics_port: u16,

    /// Maximum time to receive a request body, in seconds.
    pub read_timeout_secs: u64,

    /// Maximum time to produce a response, in seconds.
    pub write_timeout_secs: u64,

    /// Keep-alive idle window, in seconds.
    pub idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            metrics_port: 9090,
            read_timeout_secs: 30,
            write_timeout_secs: 30,
            idle_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    pub fn timeouts(&self) -> ConnectionTimeouts {
        ConnectionTimeouts {
            read: Duration::from_secs(self.read_timeout_secs),
            write: Duration::from_secs(self.write_timeout_secs),
            idle: Duration::from_secs(self.idle_timeout_secs),
        }
    }
}

/// Read/write/idle timeouts applied to a single listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionTimeouts {
    pub read: Duration,
    pub write: Duration,
    pub idle: Duration,
}

impl Default for ConnectionTimeouts {
    fn default() -> Self {
        ServerConfig::default().timeouts()
    }
}

/// Startup and shutdown budgets.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Upper bound for the whole start phase, in seconds.
    pub startup_timeout_secs: u64,

    /// Upper bound for the whole stop sequence, in seconds.
    pub shutdown_grace_secs: u64,

    /// Whether a metrics listener bind failure aborts startup.
    pub metrics_required: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            startup_timeout_secs: 15,
            shutdown_grace_secs: 30,
            metrics_required: true,
        }
    }
}

impl LifecycleConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Auto,
        }
    }
}

/// Log output format. `Auto` picks JSON in production and pretty otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Auto,
    Json,
    Pretty,
}
