use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuantviewError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job service error: {0}")]
    Api(#[from] crate::client::ApiError),

    #[error("Job view error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid API URL '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },
}

pub type Result<T> = std::result::Result<T, QuantviewError>;
