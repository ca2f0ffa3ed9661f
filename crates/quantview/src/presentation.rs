//! Pure mapping from job state to what the user sees.

use serde::Serialize;

use crate::job::{Job, JobStatus};

/// Inline message when a job could not be created.
pub const SUBMIT_FAILED_MESSAGE: &str =
    "Failed to create job. Please check the API server and try again.";

/// Inline message when polling a job failed.
pub const POLL_FAILED_MESSAGE: &str =
    "Failed to poll job status. Please check the API server and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Queued,
    InProgress,
    Succeeded,
    Failed,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    Warning,
    Info,
    Success,
    Danger,
    Muted,
}

/// How a status is shown on the job card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusPresentation {
    pub kind: StatusKind,
    /// Icon identifier; renderers pick the glyph.
    pub icon: &'static str,
    pub message: &'static str,
    pub emphasis: Emphasis,
    /// Whether the icon should pulse or spin.
    pub animated: bool,
}

/// Maps a status to its presentation. Unrecognized statuses get the
/// neutral "waiting" presentation.
pub fn present(status: &JobStatus) -> StatusPresentation {
    match status {
        JobStatus::Pending => StatusPresentation {
            kind: StatusKind::Queued,
            icon: "file-clock",
            message: "Your analysis is in the queue.",
            emphasis: Emphasis::Warning,
            animated: false,
        },
        JobStatus::DataFetching => StatusPresentation {
            kind: StatusKind::InProgress,
            icon: "database",
            message: "Agent 1: Data Agent is fetching fundamentals...",
            emphasis: Emphasis::Info,
            animated: true,
        },
        JobStatus::IntelligenceGathering => StatusPresentation {
            kind: StatusKind::InProgress,
            icon: "search",
            message: "Agent 2: Intelligence Agent is scanning news...",
            emphasis: Emphasis::Info,
            animated: true,
        },
        JobStatus::Analyzing => StatusPresentation {
            kind: StatusKind::InProgress,
            icon: "bot",
            message: "Agent 3: Analyst Agent is generating a report...",
            emphasis: Emphasis::Info,
            animated: true,
        },
        JobStatus::Success => StatusPresentation {
            kind: StatusKind::Succeeded,
            icon: "check-circle",
            message: "All agents have completed their tasks!",
            emphasis: Emphasis::Success,
            animated: false,
        },
        JobStatus::Failed => StatusPresentation {
            kind: StatusKind::Failed,
            icon: "x-circle",
            message: "Analysis failed. See error below.",
            emphasis: Emphasis::Danger,
            animated: false,
        },
        JobStatus::Unknown(_) => StatusPresentation {
            kind: StatusKind::Unknown,
            icon: "file-clock",
            message: "Waiting for status...",
            emphasis: Emphasis::Muted,
            animated: false,
        },
    }
}

/// Card title for a job.
pub fn job_title(job: &Job) -> String {
    format!("Analysis for {}", job.ticker())
}

/// Dedicated view of a job that finished in `FAILED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureView {
    pub ticker: String,
    pub headline: &'static str,
    pub explanation: String,
    pub hint: &'static str,
    /// Raw error text, shown behind a "technical details" toggle.
    pub technical_detail: String,
}

impl FailureView {
    /// Builds the failure view, or `None` unless the job failed.
    pub fn for_job(job: &Job) -> Option<Self> {
        if *job.status() != JobStatus::Failed {
            return None;
        }
        let detail = job.failure_detail()?;
        Some(Self {
            ticker: job.ticker().to_string(),
            headline: "Analysis Failed",
            explanation: format!(
                "We couldn't complete the analysis for {}. This usually means the stock symbol is incorrect or not listed.",
                job.ticker()
            ),
            hint: "Please double-check the ticker (e.g., RELIANCE.NS) and try again.",
            technical_detail: detail.to_string(),
        })
    }
}
