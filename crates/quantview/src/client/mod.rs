//! Client for the remote job service.
//!
//! `JobApi` is the seam the rest of the crate talks through; `HttpJobClient`
//! is the production implementation. Implementations are stateless and
//! never retry: each call is exactly one round trip.

pub mod error;
pub mod http;

use async_trait::async_trait;

use crate::job::{Job, JobId};

pub use error::{ApiError, ErrorKind, Result};
pub use http::HttpJobClient;

/// Operations offered by the job service.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Creates a job for `ticker`. The returned job is `PENDING`.
    async fn submit(&self, ticker: &str) -> Result<Job>;

    /// Fetches the current snapshot of a job.
    async fn fetch_status(&self, job_id: &JobId) -> Result<Job>;

    /// Lists the jobs known to the service, in service-defined order.
    async fn list_jobs(&self) -> Result<Vec<Job>>;
}

/// Trims `raw` and rejects it if nothing is left.
pub fn validate_ticker(raw: &str) -> Result<&str> {
    let ticker = raw.trim();
    if ticker.is_empty() {
        return Err(ApiError::InvalidTicker);
    }
    Ok(ticker)
}

/// Trims and uppercases a user-typed ticker.
pub fn normalize_ticker(raw: &str) -> Result<String> {
    validate_ticker(raw).map(str::to_uppercase)
}
