//! Analysis job model shared by every other module.

pub mod model;

pub use model::{Job, JobId, JobResult, JobStatus};
