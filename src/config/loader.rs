//! Configuration loading from disk, environment and command line.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::LbConfig;
use crate::config::validation::{normalize_address, validate_config, ValidationError};

/// Comma-separated list of backend base addresses.
pub const BACKEND_URLS_ENV: &str = "BACKEND_URLS";
/// Listen port override.
pub const LB_PORT_ENV: &str = "LB_PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value `{value}` for {name}")]
    InvalidEnv { name: &'static str, value: String },

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

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub backends: Option<String>,
}

/// Split a comma-separated backend list, dropping blank entries.
pub fn parse_backend_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_address)
        .filter(|address| !address.is_empty())
        .collect()
}

/// Parse a TOML configuration file without validating it.
pub fn read_config(path: &Path) -> Result<LbConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Overlay environment variables read through `lookup`.
pub fn apply_env<F>(config: &mut LbConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(BACKEND_URLS_ENV) {
        let backends = parse_backend_list(&raw);
        if !backends.is_empty() {
            config.backends = backends;
        }
    }

    if let Some(raw) = lookup(LB_PORT_ENV) {
        let raw = raw.trim();
        if !raw.is_empty() {
            config.listener.port = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                name: LB_PORT_ENV,
                value: raw.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Overlay command line values.
pub fn apply_overrides(config: &mut LbConfig, overrides: &ConfigOverrides) {
    if let Some(port) = overrides.port {
        config.listener.port = port;
    }
    if let Some(raw) = &overrides.backends {
        let backends = parse_backend_list(raw);
        if !backends.is_empty() {
            config.backends = backends;
        }
    }
}

/// Normalize backend addresses and run semantic validation.
pub fn finalize(mut config: LbConfig) -> Result<LbConfig, ConfigError> {
    config.backends = config
        .backends
        .iter()
        .map(|b| normalize_address(b))
        .filter(|b| !b.is_empty())
        .collect();

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Build the effective configuration: defaults, optional file, process
/// environment, then command line overrides.
pub fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<LbConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => LbConfig::default(),
    };

    apply_env(&mut config, |name| std::env::var(name).ok())?;
    apply_overrides(&mut config, overrides);

    finalize(config)
}
