//! Client core for stock analysis jobs.
//!
//! A ticker is submitted to the remote job service, the resulting job is
//! polled until it succeeds or fails, and every snapshot lands in a single
//! [`JobStore`] that front ends render from. Replacing the tracked job, by
//! a new submission or by picking one from history, cancels the previous
//! polling so that no stale snapshot can overwrite the view.

pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod job;
pub mod logging;
pub mod presentation;
pub mod report;
pub mod scheduler;
pub mod session;
pub mod store;

pub use client::{normalize_ticker, ApiError, ErrorKind, HttpJobClient, JobApi};
pub use config::{load_config, load_or_default, ClientConfig};
pub use error::{ConfigError, QuantviewError, Result};
pub use history::HistoryPanel;
pub use job::{Job, JobId, JobResult, JobStatus};
pub use logging::{init_logging, LogFormat};
pub use presentation::{present, FailureView, StatusKind, StatusPresentation};
pub use report::{AnalysisSummary, NewsArticle};
pub use scheduler::{BindingState, PollBinding, PollConfig, PollScheduler, StopReason};
pub use session::{JobSession, SubmitOutcome};
pub use store::{Generation, JobStore, JobViewState, StoreError, ViewError, WriteOutcome};
