//! Analysis job model and wire decoding.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Error text used when a failed job carries no error descriptor.
const MISSING_FAILURE_DETAIL: &str = "Analysis failed without an error message";

// ─── JobId ──────────────────────────────────────────────────────────────────

/// Opaque job identifier assigned by the job service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ─── JobStatus ──────────────────────────────────────────────────────────────

/// Status of an analysis job.
///
/// The first four variants are the sequential stages of the analysis
/// pipeline; `Success` and `Failed` are terminal. Any status string the
/// client does not recognize is kept verbatim in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Pending,
    DataFetching,
    IntelligenceGathering,
    Analyzing,
    Success,
    Failed,
    Unknown(String),
}

impl JobStatus {
    /// Parses a wire status. Never fails.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PENDING" => JobStatus::Pending,
            "DATA_FETCHING" => JobStatus::DataFetching,
            "INTELLIGENCE_GATHERING" => JobStatus::IntelligenceGathering,
            "ANALYZING" => JobStatus::Analyzing,
            "SUCCESS" => JobStatus::Success,
            "FAILED" => JobStatus::Failed,
            other => JobStatus::Unknown(other.to_string()),
        }
    }

    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::DataFetching => "DATA_FETCHING",
            JobStatus::IntelligenceGathering => "INTELLIGENCE_GATHERING",
            JobStatus::Analyzing => "ANALYZING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
            JobStatus::Unknown(raw) => raw,
        }
    }

    /// Returns true for `Success` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }

    /// Position in the pipeline. `Unknown` has no rank.
    pub fn stage(&self) -> Option<u8> {
        match self {
            JobStatus::Pending => Some(0),
            JobStatus::DataFetching => Some(1),
            JobStatus::IntelligenceGathering => Some(2),
            JobStatus::Analyzing => Some(3),
            JobStatus::Success | JobStatus::Failed => Some(4),
            JobStatus::Unknown(_) => None,
        }
    }

    /// Whether a job observed in `self` may next be observed in `next`.
    ///
    /// Stages only move forward (polling may skip stages), `Failed` is
    /// reachable from any non-terminal status and terminal statuses never
    /// change. Unranked statuses are tolerated on either side.
    pub fn can_transition_to(&self, next: &JobStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self.stage(), next.stage()) {
            (Some(current), Some(upcoming)) => upcoming > current || *next == JobStatus::Failed,
            _ => true,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match JobStatus::parse(&raw) {
            JobStatus::Unknown(_) => JobStatus::Unknown(raw),
            known => known,
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

// ─── JobResult ──────────────────────────────────────────────────────────────

/// Payload of a job that reached a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobResult {
    /// Analysis data produced by a successful job.
    Analysis(Map<String, Value>),
    /// Error descriptor of a failed job, plus whatever partial data the
    /// service had gathered before failing.
    Failure {
        error: String,
        #[serde(flatten)]
        details: Map<String, Value>,
    },
}

impl JobResult {
    /// Returns the analysis fields, if this is a successful result.
    pub fn analysis(&self) -> Option<&Map<String, Value>> {
        match self {
            JobResult::Analysis(fields) => Some(fields),
            JobResult::Failure { .. } => None,
        }
    }

    /// Returns the raw error text, if this is a failure.
    pub fn error(&self) -> Option<&str> {
        match self {
            JobResult::Failure { error, .. } => Some(error),
            JobResult::Analysis(_) => None,
        }
    }
}

// ─── Job ────────────────────────────────────────────────────────────────────

/// One analysis run as reported by the job service.
///
/// `result` is present if and only if `status` is terminal; every
/// constructor enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireJob")]
pub struct Job {
    id: JobId,
    ticker: String,
    status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    result: Option<JobResult>,
}

impl Job {
    /// A freshly created job: `PENDING`, no result.
    pub fn pending(id: impl Into<JobId>, ticker: &str) -> Self {
        Self {
            id: id.into(),
            ticker: ticker.to_string(),
            status: JobStatus::Pending,
            created_at: None,
            result: None,
        }
    }

    /// Builds a job from raw parts, coupling `result` to `status`.
    ///
    /// A non-terminal status discards any payload. A terminal status
    /// without a usable payload gets an empty analysis (`SUCCESS`) or a
    /// generic error descriptor (`FAILED`).
    pub fn from_parts(
        id: impl Into<JobId>,
        ticker: &str,
        status: JobStatus,
        raw_result: Option<Value>,
    ) -> Self {
        let id = id.into();
        let result = couple_result(&id, &status, raw_result);
        Self {
            id,
            ticker: ticker.to_string(),
            status,
            created_at: None,
            result,
        }
    }

    /// Sets the service-assigned creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn result(&self) -> Option<&JobResult> {
        self.result.as_ref()
    }

    /// Returns true if this job is finished (succeeded or failed).
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns the raw failure text of a `FAILED` job.
    pub fn failure_detail(&self) -> Option<&str> {
        self.result.as_ref().and_then(JobResult::error)
    }
}

fn couple_result(job_id: &JobId, status: &JobStatus, raw: Option<Value>) -> Option<JobResult> {
    match status {
        JobStatus::Success => {
            let fields = match raw {
                Some(Value::Object(fields)) => fields,
                Some(Value::Null) | None => {
                    log::warn!("Job {} succeeded without a result payload", job_id);
                    Map::new()
                }
                Some(other) => {
                    log::warn!("Job {} succeeded with a non-object result", job_id);
                    let mut fields = Map::new();
                    fields.insert("value".to_string(), other);
                    fields
                }
            };
            Some(JobResult::Analysis(fields))
        }
        JobStatus::Failed => {
            let mut details = match raw {
                Some(Value::Object(fields)) => fields,
                _ => Map::new(),
            };
            let error = match details.remove("error") {
                Some(Value::String(text)) => text,
                Some(Value::Null) | None => MISSING_FAILURE_DETAIL.to_string(),
                Some(other) => other.to_string(),
            };
            Some(JobResult::Failure { error, details })
        }
        _ => {
            if raw.as_ref().is_some_and(|value| !value.is_null()) {
                log::debug!(
                    "Dropping partial result of job {} while it is {}",
                    job_id,
                    status
                );
            }
            None
        }
    }
}

// ─── Wire decoding ──────────────────────────────────────────────────────────

/// Job exactly as it appears on the wire.
#[derive(Debug, Deserialize)]
struct WireJob {
    id: JobId,
    ticker: String,
    status: JobStatus,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    result: Option<Value>,
}

impl From<WireJob> for Job {
    fn from(wire: WireJob) -> Self {
        let job = Job::from_parts(wire.id, &wire.ticker, wire.status, wire.result);
        match wire.created_at {
            Some(created_at) => job.with_created_at(created_at),
            None => job,
        }
    }
}

/// Accepts RFC 3339 timestamps as well as naive ones (assumed UTC). An
/// unparseable value is logged and treated as absent.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => Some(naive.and_utc()),
        Err(e) => {
            log::warn!("parse_timestamp: failed to parse '{}': {}", raw, e);
            None
        }
    }
}
