//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{Environment, LogLevel, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_VAR: &str = "HEALTHLOG_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A validated configuration plus the non-fatal problems met while
/// building it. Warnings are returned rather than logged because the
/// subscriber is configured from the result.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ServiceConfig,
    pub warnings: Vec<String>,
}

/// Load the optional TOML file, apply process environment overrides and validate.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an injectable environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, env: F) -> Result<LoadedConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    let warnings = apply_env_overrides(&mut config, &env);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(LoadedConfig { config, warnings })
}

fn apply_env_overrides<F>(config: &mut ServiceConfig, env: &F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut warnings = Vec::new();

    if let Some(raw) = env("ENV") {
        config.environment = raw.parse().unwrap_or_else(|_| {
            warnings.push(format!(
                "ENV={raw} is illegal, falling back to {} mode",
                Environment::default()
            ));
            Environment::default()
        });
    }

    if let Some(raw) = env("LOG_LEVEL") {
        config.observability.log_level = raw.parse().unwrap_or_else(|_| {
            warnings.push(format!(
                "LOG_LEVEL={raw} is illegal, falling back to {}",
                LogLevel::default()
            ));
            LogLevel::default()
        });
    }

    if let Some(raw) = env("PORT") {
        match raw.trim().parse::<u16>() {
            Ok(port) => config.listener.port = port,
            Err(_) => warnings.push(format!(
                "PORT={raw} is not a valid port, using {}",
                config.listener.port
            )),
        }
    }

    if let Some(token) = env("API_TOKEN") {
        config.api.token = token;
    }

    if let Some(url) = env("DATABASE_URL") {
        config.storage.database_url = url;
    }

    if let Some(raw) = env("METRICS_ENABLED") {
        config.observability.metrics_enabled = matches!(raw.as_str(), "true" | "1");
    }

    if let Some(addr) = env("METRICS_ADDRESS") {
        config.observability.metrics_address = addr;
    }

    warnings
}
