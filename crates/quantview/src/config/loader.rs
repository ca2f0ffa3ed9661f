use std::path::{Path, PathBuf};

use crate::config::schema::{ClientConfig, MIN_POLL_INTERVAL_MS};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// Environment variable that overrides `apiUrl`.
pub const API_URL_ENV: &str = "QUANTVIEW_API_URL";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<ClientConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: ClientConfig = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Loads the configuration for a run.
///
/// An explicit `path` must exist. Without one, the per-user config file is
/// used when present and the built-in defaults otherwise. Environment
/// overrides are applied last.
pub fn load_or_default(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => {
                log::debug!("Loading config from {:?}", path);
                load_config(&path)?
            }
            _ => ClientConfig::default(),
        },
    };

    apply_env_overrides(&mut config);
    validate_config(&config)?;
    Ok(config)
}

/// Applies `QUANTVIEW_API_URL`, ignoring empty values.
pub fn apply_env_overrides(config: &mut ClientConfig) {
    if let Ok(url) = std::env::var(API_URL_ENV) {
        let url = url.trim();
        if !url.is_empty() {
            log::debug!("Using API URL from {}: {}", API_URL_ENV, url);
            config.api_url = url.to_string();
        }
    }
}

/// `<platform config dir>/quantview/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("quantview").join("config.json"))
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &ClientConfig) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(&config.api_url).map_err(|e| ConfigError::InvalidApiUrl {
        url: config.api_url.clone(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidApiUrl {
            url: config.api_url.clone(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    if config.poll_interval_ms < MIN_POLL_INTERVAL_MS {
        return Err(ConfigError::Validation {
            message: format!(
                "pollIntervalMs must be at least {} (got {})",
                MIN_POLL_INTERVAL_MS, config.poll_interval_ms
            ),
        });
    }

    Ok(())
}
