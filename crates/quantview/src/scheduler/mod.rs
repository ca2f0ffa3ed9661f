//! Polling of the current job until it finishes or is superseded.

pub mod poller;

pub use poller::{BindingState, PollBinding, PollConfig, PollScheduler, StopReason};
