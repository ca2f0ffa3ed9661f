//! Builders for job snapshots as the service would report them.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use quantview::{Job, JobStatus};
use serde_json::{json, Value};

/// Builder for `Job` snapshots.
pub struct JobBuilder {
    id: String,
    ticker: String,
    status: JobStatus,
    result: Option<Value>,
    created_at: Option<DateTime<Utc>>,
}

impl JobBuilder {
    /// A `PENDING` job with no result.
    pub fn new(id: &str, ticker: &str) -> Self {
        Self {
            id: id.to_string(),
            ticker: ticker.to_string(),
            status: JobStatus::Pending,
            result: None,
            created_at: None,
        }
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn build(self) -> Job {
        let job = Job::from_parts(self.id.as_str(), &self.ticker, self.status, self.result);
        match self.created_at {
            Some(created_at) => job.with_created_at(created_at),
            None => job,
        }
    }
}

pub fn pending(id: &str, ticker: &str) -> Job {
    JobBuilder::new(id, ticker).build()
}

pub fn running(id: &str, ticker: &str, status: JobStatus) -> Job {
    JobBuilder::new(id, ticker).status(status).build()
}

pub fn succeeded(id: &str, ticker: &str) -> Job {
    JobBuilder::new(id, ticker)
        .status(JobStatus::Success)
        .result(analysis_result(ticker))
        .build()
}

pub fn failed(id: &str, ticker: &str, error: &str) -> Job {
    JobBuilder::new(id, ticker)
        .status(JobStatus::Failed)
        .result(json!({ "error": error }))
        .build()
}

/// A result shaped like the one the analysis pipeline assembles.
pub fn analysis_result(ticker: &str) -> Value {
    json!({
        "company_name": format!("{} Limited", ticker.trim_end_matches(".NS")),
        "sector": "Energy",
        "current_price": 2950.5,
        "previous_close": 2900.0,
        "market_cap": 19_960_000_000_000_i64,
        "intelligence_briefing": {
            "articles": [
                { "title": "Quarterly results beat estimates", "source": "Mint", "sentiment": "Positive" }
            ]
        },
        "llm_analysis": { "llm_report": "## Outlook\nStable." }
    })
}
