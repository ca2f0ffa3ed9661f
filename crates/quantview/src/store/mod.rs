//! Job view state shared by the scheduler, the history selector and the
//! renderers.

pub mod error;
pub mod job_store;

pub use error::StoreError;
pub use job_store::{Generation, JobStore, JobViewState, ViewError, WriteOutcome};
