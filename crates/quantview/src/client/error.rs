//! Job service client error types.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while talking to the job service.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The ticker was empty after trimming; no request was issued.
    #[error("Ticker must not be empty")]
    InvalidTicker,

    /// The configured service URL is unusable.
    #[error("Invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No response reached the client.
    #[error("Could not reach job service: {0}")]
    Transport(String),

    /// The request did not complete within the allotted time.
    #[error("Job service request timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered with a non-success status.
    #[error("Job service returned {status}: {message}")]
    Service { status: u16, message: String },

    /// The service answered successfully but the body was unusable.
    #[error("Failed to decode job service response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classifies this error for the view state.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::InvalidTicker | ApiError::InvalidUrl { .. } => ErrorKind::InvalidRequest,
            ApiError::Transport(_) | ApiError::Timeout(_) => ErrorKind::Transport,
            ApiError::Service { .. } | ApiError::Decode(_) => ErrorKind::Service,
        }
    }
}

/// Coarse classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connectivity failure; nothing came back.
    Transport,
    /// A response came back but signalled failure.
    Service,
    /// Rejected locally before any request.
    InvalidRequest,
}

/// Result type for job service operations.
pub type Result<T> = std::result::Result<T, ApiError>;
