use thiserror::Error;

use crate::job::{JobId, JobStatus};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// Only finished jobs can be loaded from history.
    #[error("Job {job_id} is still {status} and cannot be shown as a historical job")]
    NotTerminal { job_id: JobId, status: JobStatus },
}
