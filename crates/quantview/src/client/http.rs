//! HTTP implementation of the job service client.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::error::{ApiError, Result};
use super::{validate_ticker, JobApi};
use crate::config::ClientConfig;
use crate::job::{Job, JobId};

/// Maximum length for error bodies carried into error messages.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Default connect timeout for HTTP requests (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout for HTTP requests (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    ticker: &'a str,
}

/// Job service client over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpJobClient {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpJobClient {
    /// Creates a client with the default timeouts.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeouts(base_url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a client from the loaded configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::with_timeouts(
            &config.api_url,
            config.connect_timeout(),
            config.request_timeout(),
        )
    }

    /// Creates a client with explicit timeouts.
    pub fn with_timeouts(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            request_timeout,
        })
    }

    /// The service root all endpoints are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn classify(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.request_timeout)
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("no response body")
                    .to_string()
            } else {
                service_message(&body)
            };
            return Err(ApiError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl JobApi for HttpJobClient {
    async fn submit(&self, ticker: &str) -> Result<Job> {
        let ticker = validate_ticker(ticker)?;
        let url = self.endpoint(&["jobs"])?;
        info!("Creating analysis job for {}", ticker);

        let response = self
            .client
            .post(url)
            .json(&SubmitRequest { ticker })
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let job: Job = self.decode(response).await?;
        info!("Job {} created for {}", job.id(), job.ticker());
        Ok(job)
    }

    async fn fetch_status(&self, job_id: &JobId) -> Result<Job> {
        let url = self.endpoint(&["jobs", job_id.as_str()])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let job: Job = self.decode(response).await?;
        debug!("Job {} is {}", job.id(), job.status());
        Ok(job)
    }

    async fn list_jobs(&self) -> Result<Vec<Job>> {
        let url = self.endpoint(&["jobs"])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let jobs: Vec<Job> = self.decode(response).await?;
        debug!("Job service returned {} jobs", jobs.len());
        Ok(jobs)
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| ApiError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ApiError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Extracts a readable message from an error body.
///
/// The service reports errors as `{"detail": ...}`; anything else is
/// passed through, truncated.
fn service_message(body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        match fields.get("detail") {
            Some(Value::String(detail)) => return truncate_body(detail),
            Some(other) => return truncate_body(&other.to_string()),
            None => {}
        }
    }
    truncate_body(body.trim())
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_LENGTH) {
        Some((cut, _)) => format!("{}... (truncated)", &body[..cut]),
        None => body.to_string(),
    }
}
