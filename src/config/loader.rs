//! Configuration loading from disk and environment.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::ConfigSnapshot;
use crate::config::validation::{validate_config, ValidationError};

/// Locations probed, in order, when no explicit path is given.
pub const SEARCH_PATHS: &[&str] = &[
    "config.toml",
    "config/config.toml",
    "/etc/novatra/config.toml",
];

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file was found; defaults plus environment overrides.
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => f.write_str("defaults"),
        }
    }
}

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value `{value}` for {key}")]
    Env { key: &'static str, value: String },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve the configuration snapshot for this process.
///
/// An explicit `path` must exist. Without one the [`SEARCH_PATHS`] are probed
/// and defaults are used if none exists. Environment overrides are applied
/// last, then the result is validated.
///
/// Runs before logging is initialized, so the source is returned for the
/// caller to report.
pub fn load_config(path: Option<&Path>) -> Result<(ConfigSnapshot, ConfigSource), ConfigError> {
    let found = match path {
        Some(path) => Some(path),
        None => SEARCH_PATHS.iter().map(Path::new).find(|p| p.is_file()),
    };
    let (mut config, source) = match found {
        Some(path) => (read_file(path)?, ConfigSource::File(path.to_path_buf())),
        None => (ConfigSnapshot::default(), ConfigSource::Defaults),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok((config, source))
}

/// Parse and validate a TOML document without consulting the environment.
pub fn load_from_str(content: &str) -> Result<ConfigSnapshot, ConfigError> {
    let config: ConfigSnapshot = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<ConfigSnapshot, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Overlay environment variables onto a parsed configuration.
///
/// `lookup` abstracts the process environment so callers can inject values.
/// `PORT` is honored for platforms that assign the listening port, and takes
/// precedence over `NOVATRA_SERVER_PORT`.
pub fn apply_env_overrides<F>(config: &mut ConfigSnapshot, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("NOVATRA_ENVIRONMENT") {
        config.environment = value;
    }
    if let Some(value) = lookup("NOVATRA_VERSION") {
        config.version = value;
    }
    if let Some(value) = lookup("NOVATRA_SERVER_HOST") {
        config.server.host = value;
    }
    if let Some(port) = parse_env(&lookup, "NOVATRA_SERVER_PORT")? {
        config.server.port = port;
    }
    if let Some(port) = parse_env(&lookup, "PORT")? {
        config.server.port = port;
    }
    if let Some(port) = parse_env(&lookup, "NOVATRA_SERVER_METRICS_PORT")? {
        config.server.metrics_port = port;
    }
    if let Some(secs) = parse_env(&lookup, "NOVATRA_SHUTDOWN_GRACE_SECS")? {
        config.lifecycle.shutdown_grace_secs = secs;
    }
    if let Some(secs) = parse_env(&lookup, "NOVATRA_STARTUP_TIMEOUT_SECS")? {
        config.lifecycle.startup_timeout_secs = secs;
    }
    if let Some(value) = lookup("NOVATRA_LOG_LEVEL") {
        config.observability.log_level = value;
    }
    if let Some(debug) = parse_env(&lookup, "NOVATRA_DEBUG")? {
        config.debug = debug;
    }
    Ok(())
}

fn parse_env<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = ConfigSnapshot::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("NOVATRA_ENVIRONMENT", "production"),
                ("NOVATRA_SERVER_PORT", "7000"),
                ("NOVATRA_SERVER_METRICS_PORT", "7001"),
                ("NOVATRA_SHUTDOWN_GRACE_SECS", "5"),
            ]),
        )
        .unwrap();

        assert!(config.is_production());
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.metrics_port, 7001);
        assert_eq!(config.lifecycle.shutdown_grace_secs, 5);
    }

    #[test]
    fn port_variable_wins() {
        let mut config = ConfigSnapshot::default();
        apply_env_overrides(
            &mut config,
            env(&[("NOVATRA_SERVER_PORT", "7000"), ("PORT", "5000")]),
        )
        .unwrap();
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn malformed_env_value_is_rejected() {
        let mut config = ConfigSnapshot::default();
        let err = apply_env_overrides(&mut config, env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "PORT", .. }));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn load_from_str_validates() {
        let err = load_from_str("[server]\nport = 9090\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::PortCollision(9090)]);
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn explicit_file_is_reported_as_source() {
        let path = std::env::temp_dir().join(format!("novatra-config-{}.toml", std::process::id()));
        fs::write(&path, "environment = \"staging\"\n[server]\nport = 7100\n").unwrap();

        let (config, source) = load_config(Some(&path)).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(source, ConfigSource::File(path.clone()));
        assert_eq!(source.to_string(), path.display().to_string());
        assert_eq!(config.environment, "staging");
    }

    #[test]
    fn debug_flag_can_be_disabled_from_env() {
        let mut config = ConfigSnapshot::default();
        assert!(config.debug);
        apply_env_overrides(&mut config, env(&[("NOVATRA_DEBUG", "false")])).unwrap();
        assert!(!config.debug);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
