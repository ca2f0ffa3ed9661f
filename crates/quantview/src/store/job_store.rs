//! The job view store: the single writable source of truth for the view.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tokio::sync::{broadcast, watch};

use super::error::StoreError;
use crate::client::{ApiError, ErrorKind};
use crate::job::Job;
use crate::presentation::{POLL_FAILED_MESSAGE, SUBMIT_FAILED_MESSAGE};

/// Cancellation marker. Bumped every time the current job is replaced.
pub type Generation = u64;

/// Default capacity of the view-change channel.
const DEFAULT_CHANGE_CAPACITY: usize = 64;

// ─── View state ─────────────────────────────────────────────────────────────

/// A classified failure shown inline in the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewError {
    pub kind: ErrorKind,
    /// User-facing message.
    pub message: String,
    /// Technical description, for logs and diagnostics.
    pub detail: String,
}

impl ViewError {
    pub fn new(kind: ErrorKind, message: &str, detail: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
            detail: detail.to_string(),
        }
    }

    /// A failed job creation request.
    pub fn submission(err: &ApiError) -> Self {
        Self::new(err.kind(), SUBMIT_FAILED_MESSAGE, &err.to_string())
    }

    /// A failed status fetch while polling.
    pub fn polling(err: &ApiError) -> Self {
        Self::new(err.kind(), POLL_FAILED_MESSAGE, &err.to_string())
    }
}

/// Snapshot of everything the view renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobViewState {
    pub current_job: Option<Job>,
    /// Between a creation request and the job leaving `PENDING`.
    pub submitting: bool,
    /// While a polling binding is tracking `current_job`.
    pub polling: bool,
    pub last_error: Option<ViewError>,
    #[serde(skip)]
    generation: Generation,
    /// Furthest pipeline stage applied for `current_job`.
    #[serde(skip)]
    peak_stage: Option<u8>,
}

impl JobViewState {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// True while a submission or polling is in progress.
    pub fn is_busy(&self) -> bool {
        self.submitting || self.polling
    }
}

/// Result of a guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write was applied.
    Applied,
    /// The writer is still current but the snapshot was stale or moved the
    /// job backwards; nothing changed.
    Ignored,
    /// The writer's generation is gone; nothing changed.
    Superseded,
}

// ─── JobStore ───────────────────────────────────────────────────────────────

/// Single-owner store for the job view.
///
/// Every mutation happens under one write lock, so replacing the current
/// job is atomic and a guarded write either sees the current generation
/// or is discarded. Each applied change is published to subscribers, and
/// each generation bump is published on the cancellation channel.
pub struct JobStore {
    state: RwLock<JobViewState>,
    cancel_tx: watch::Sender<Generation>,
    changes: broadcast::Sender<JobViewState>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANGE_CAPACITY)
    }

    /// Creates a store whose change channel buffers `capacity` snapshots.
    pub fn with_capacity(capacity: usize) -> Self {
        let (cancel_tx, _) = watch::channel(0);
        let (changes, _) = broadcast::channel(capacity);
        Self {
            state: RwLock::new(JobViewState::default()),
            cancel_tx,
            changes,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, JobViewState> {
        match self.state.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job view lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, JobViewState> {
        match self.state.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job view lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Publishes a snapshot. Called with the write lock held so
    /// subscribers observe changes in write order.
    fn publish(&self, state: &JobViewState) {
        // No active receivers is fine
        let _ = self.changes.send(state.clone());
    }

    fn bump_generation(&self, state: &mut JobViewState) -> Generation {
        state.generation += 1;
        self.cancel_tx.send_replace(state.generation);
        state.generation
    }

    /// Returns a copy of the current view.
    pub fn snapshot(&self) -> JobViewState {
        self.read().clone()
    }

    pub fn generation(&self) -> Generation {
        self.read().generation
    }

    /// Returns true if `generation` still owns the view.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.read().generation == generation
    }

    /// Subscribes to view changes.
    pub fn subscribe(&self) -> broadcast::Receiver<JobViewState> {
        self.changes.subscribe()
    }

    /// Subscribes to generation bumps, i.e. supersession signals.
    pub fn cancellation(&self) -> watch::Receiver<Generation> {
        self.cancel_tx.subscribe()
    }

    /// Starts a new submission: clears the view, marks it submitting and
    /// polling, and supersedes whatever was tracked before.
    pub fn begin_submission(&self) -> Generation {
        let mut state = self.write();
        let generation = self.bump_generation(&mut state);
        state.current_job = None;
        state.peak_stage = None;
        state.submitting = true;
        state.polling = true;
        state.last_error = None;
        self.publish(&state);
        generation
    }

    /// Replaces the current job on behalf of `generation`.
    ///
    /// Clears `submitting` once the job has left `PENDING` and `polling`
    /// once it is terminal. A snapshot of the same job that would move its
    /// status backwards is ignored, as is a snapshot of any other job once
    /// the generation is bound to one.
    pub fn set_job(&self, generation: Generation, job: Job) -> WriteOutcome {
        let mut state = self.write();
        if state.generation != generation {
            log::debug!(
                "Discarding snapshot of job {} from superseded generation {}",
                job.id(),
                generation
            );
            return WriteOutcome::Superseded;
        }

        let same_job = state
            .current_job
            .as_ref()
            .is_some_and(|current| current.id() == job.id());
        if !same_job {
            if let Some(current) = &state.current_job {
                log::warn!(
                    "Ignoring snapshot of job {} while tracking job {}",
                    job.id(),
                    current.id()
                );
                return WriteOutcome::Ignored;
            }
        }
        if same_job && is_regression(&state, &job) {
            log::warn!(
                "Ignoring out-of-order status for job {}: {}",
                job.id(),
                job.status()
            );
            return WriteOutcome::Ignored;
        }

        state.peak_stage = state.peak_stage.max(job.status().stage());
        if *job.status() != crate::job::JobStatus::Pending {
            state.submitting = false;
        }
        if job.is_terminal() {
            state.polling = false;
        }
        state.current_job = Some(job);
        self.publish(&state);
        WriteOutcome::Applied
    }

    /// Records a failure on behalf of `generation` and stops the busy
    /// flags. The current job, if any, is kept.
    pub fn set_error(&self, generation: Generation, error: ViewError) -> WriteOutcome {
        let mut state = self.write();
        if state.generation != generation {
            log::debug!(
                "Discarding error from superseded generation {}: {}",
                generation,
                error.detail
            );
            return WriteOutcome::Superseded;
        }

        state.last_error = Some(error);
        state.submitting = false;
        state.polling = false;
        self.publish(&state);
        WriteOutcome::Applied
    }

    /// Clears the busy flags on behalf of `generation` without recording
    /// an error. Used when polling ends before the job finished.
    pub fn end_polling(&self, generation: Generation) -> WriteOutcome {
        let mut state = self.write();
        if state.generation != generation {
            return WriteOutcome::Superseded;
        }
        if !state.is_busy() {
            return WriteOutcome::Ignored;
        }
        state.submitting = false;
        state.polling = false;
        self.publish(&state);
        WriteOutcome::Applied
    }

    /// Shows a finished job picked from history, superseding any
    /// submission or polling in progress.
    pub fn select_historical(&self, job: Job) -> Result<Generation, StoreError> {
        if !job.is_terminal() {
            return Err(StoreError::NotTerminal {
                job_id: job.id().clone(),
                status: job.status().clone(),
            });
        }

        let mut state = self.write();
        let generation = self.bump_generation(&mut state);
        log::info!("Showing historical job {} ({})", job.id(), job.status());
        state.peak_stage = job.status().stage();
        state.current_job = Some(job);
        state.submitting = false;
        state.polling = false;
        state.last_error = None;
        self.publish(&state);
        Ok(generation)
    }
}

/// A snapshot of the tracked job regresses if it leaves a terminal status
/// or ranks below a stage already applied. Unranked statuses only fail the
/// first check; they never lower the recorded stage.
fn is_regression(state: &JobViewState, job: &Job) -> bool {
    let Some(current) = &state.current_job else {
        return false;
    };
    if !current.status().can_transition_to(job.status()) {
        return true;
    }
    match (job.status().stage(), state.peak_stage) {
        (Some(upcoming), Some(peak)) => upcoming < peak,
        _ => false,
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
