//! Polling scheduler bound to a single job.
//!
//! Each binding owns one background task that waits for the next tick,
//! fetches the job, and writes the snapshot into the store under the
//! generation captured at bind time. The binding stops on a terminal
//! status, on the first failed fetch, or as soon as the store's generation
//! moves on. Bindings are never reused across jobs.
//!
//! The task runs under a supervisor that releases the view if the task
//! panics or is aborted, so the view never stays busy without a poller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::client::{ApiError, ErrorKind, JobApi};
use crate::config::{ClientConfig, MIN_POLL_INTERVAL_MS};
use crate::job::{Job, JobId};
use crate::presentation::POLL_FAILED_MESSAGE;
use crate::store::{Generation, JobStore, ViewError, WriteOutcome};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(MIN_POLL_INTERVAL_MS);

/// Timing of a polling binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Limit for a single status fetch; expiry counts as a transport
    /// failure.
    pub request_timeout: Option<Duration>,
}

impl PollConfig {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            request_timeout: config.poll_request_timeout(),
        }
    }

    /// Raises the interval to the supported minimum.
    pub fn clamped(mut self) -> Self {
        if self.interval < MIN_POLL_INTERVAL {
            warn!(
                "Poll interval {:?} is below the minimum, using {:?}",
                self.interval, MIN_POLL_INTERVAL
            );
            self.interval = MIN_POLL_INTERVAL;
        }
        self
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            request_timeout: None,
        }
    }
}

/// Lifecycle of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Idle,
    Active,
    Stopped,
}

/// Why a binding stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The job reached `SUCCESS` or `FAILED`.
    Terminal,
    /// A status fetch failed.
    FetchFailed(ErrorKind),
    /// The job was superseded by a new submission or a history selection,
    /// or polling was aborted.
    Cancelled,
    /// The polling task died; the failure is in the view.
    Crashed,
}

/// Creates polling bindings against one store and one job service.
pub struct PollScheduler {
    api: Arc<dyn JobApi>,
    store: Arc<JobStore>,
    config: PollConfig,
}

impl PollScheduler {
    pub fn new(api: Arc<dyn JobApi>, store: Arc<JobStore>, config: PollConfig) -> Self {
        Self {
            api,
            store,
            config: config.clamped(),
        }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Creates an idle binding that tracks `job` for `generation`.
    pub fn bind(&self, generation: Generation, job: &Job) -> PollBinding {
        let state = Arc::new(Mutex::new(BindingState::Idle));
        let ticks = Arc::new(AtomicU64::new(0));
        let task = PollTask {
            api: Arc::clone(&self.api),
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            job_id: job.id().clone(),
            generation,
            state: Arc::clone(&state),
            ticks: Arc::clone(&ticks),
        };

        PollBinding {
            job_id: job.id().clone(),
            generation,
            terminal_at_bind: job.is_terminal(),
            state,
            ticks,
            store: Arc::clone(&self.store),
            pending: Some(task),
            handle: None,
            abort: None,
        }
    }
}

/// One job id tracked by one background task.
pub struct PollBinding {
    job_id: JobId,
    generation: Generation,
    terminal_at_bind: bool,
    state: Arc<Mutex<BindingState>>,
    ticks: Arc<AtomicU64>,
    store: Arc<JobStore>,
    pending: Option<PollTask>,
    handle: Option<JoinHandle<StopReason>>,
    abort: Option<AbortHandle>,
}

impl PollBinding {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Number of status fetches issued so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Current lifecycle state. A binding whose generation has been
    /// superseded reports `Stopped` even before its task has noticed.
    pub fn state(&self) -> BindingState {
        let state = *lock_state(&self.state);
        if state == BindingState::Active && !self.store.is_current(self.generation) {
            BindingState::Stopped
        } else {
            state
        }
    }

    /// Spawns the polling task. Must be called within a tokio runtime.
    /// A job that is already terminal is never polled.
    pub fn start(&mut self) {
        let Some(task) = self.pending.take() else {
            return;
        };

        if self.terminal_at_bind {
            debug!("Job {} is already finished, not polling", self.job_id);
            *lock_state(&self.state) = BindingState::Stopped;
            return;
        }

        *lock_state(&self.state) = BindingState::Active;
        let inner = tokio::spawn(task.run());
        self.abort = Some(inner.abort_handle());
        self.handle = Some(tokio::spawn(supervise(
            inner,
            self.job_id.clone(),
            self.generation,
            Arc::clone(&self.store),
            Arc::clone(&self.state),
        )));
    }

    /// Waits for the task to stop on its own.
    pub async fn join(mut self) -> Option<StopReason> {
        if self.terminal_at_bind {
            return Some(StopReason::Terminal);
        }
        let handle = self.handle.take()?;
        match handle.await {
            Ok(reason) => Some(reason),
            Err(e) => {
                warn!("Polling task for job {} ended abnormally: {}", self.job_id, e);
                *lock_state(&self.state) = BindingState::Stopped;
                None
            }
        }
    }

    /// Stops the task immediately. Used on shutdown; supersession goes
    /// through the store instead.
    pub fn abort(&mut self) {
        self.pending = None;
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
        *lock_state(&self.state) = BindingState::Stopped;
    }
}

/// Waits for a polling task and releases the view on its behalf if it
/// did not stop normally.
async fn supervise(
    task: JoinHandle<StopReason>,
    job_id: JobId,
    generation: Generation,
    store: Arc<JobStore>,
    state: Arc<Mutex<BindingState>>,
) -> StopReason {
    let reason = match task.await {
        Ok(reason) => reason,
        Err(e) => released(&store, &job_id, generation, e),
    };
    *lock_state(&state) = BindingState::Stopped;
    reason
}

fn released(store: &JobStore, job_id: &JobId, generation: Generation, e: JoinError) -> StopReason {
    if e.is_cancelled() {
        debug!("Polling of job {} was aborted", job_id);
        store.end_polling(generation);
        return StopReason::Cancelled;
    }

    warn!("Polling task for job {} ended abnormally: {}", job_id, e);
    let error = ViewError::new(
        ErrorKind::Transport,
        POLL_FAILED_MESSAGE,
        &format!("polling of job {} stopped unexpectedly", job_id),
    );
    match store.set_error(generation, error) {
        WriteOutcome::Superseded => StopReason::Cancelled,
        _ => StopReason::Crashed,
    }
}

fn lock_state(state: &Mutex<BindingState>) -> std::sync::MutexGuard<'_, BindingState> {
    match state.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

struct PollTask {
    api: Arc<dyn JobApi>,
    store: Arc<JobStore>,
    config: PollConfig,
    job_id: JobId,
    generation: Generation,
    state: Arc<Mutex<BindingState>>,
    ticks: Arc<AtomicU64>,
}

impl PollTask {
    async fn run(self) -> StopReason {
        let span = info_span!("poll_job", job_id = %self.job_id, generation = self.generation);
        let reason = self.poll_until_stopped().instrument(span).await;
        *lock_state(&self.state) = BindingState::Stopped;
        reason
    }

    async fn poll_until_stopped(&self) -> StopReason {
        let mut cancel_rx = self.store.cancellation();
        let mut timer = tokio::time::interval(self.config.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await; // skip immediate first tick

        info!("Polling every {:?}", self.config.interval);

        let reason = loop {
            if !self.store.is_current(self.generation) {
                break StopReason::Cancelled;
            }

            tokio::select! {
                _ = timer.tick() => {},
                changed = cancel_rx.changed() => {
                    if changed.is_err() || *cancel_rx.borrow_and_update() != self.generation {
                        break StopReason::Cancelled;
                    }
                    continue;
                }
            }

            if !self.store.is_current(self.generation) {
                break StopReason::Cancelled;
            }

            self.ticks.fetch_add(1, Ordering::AcqRel);
            match self.fetch().await {
                Ok(job) if job.id() != &self.job_id => {
                    warn!("Service answered with job {}, ignoring", job.id());
                }
                Ok(job) => {
                    let terminal = job.is_terminal();
                    let status = job.status().clone();
                    match self.store.set_job(self.generation, job) {
                        WriteOutcome::Superseded => break StopReason::Cancelled,
                        WriteOutcome::Applied if terminal => {
                            info!("Job finished with {}", status);
                            break StopReason::Terminal;
                        }
                        WriteOutcome::Applied => debug!("Job is {}", status),
                        WriteOutcome::Ignored => {}
                    }
                }
                Err(e) => {
                    warn!("Status fetch failed: {}", e);
                    let kind = e.kind();
                    break match self.store.set_error(self.generation, ViewError::polling(&e)) {
                        WriteOutcome::Superseded => StopReason::Cancelled,
                        _ => StopReason::FetchFailed(kind),
                    };
                }
            }
        };

        debug!("Polling stopped: {:?}", reason);
        reason
    }

    async fn fetch(&self) -> Result<Job, ApiError> {
        match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, self.api.fetch_status(&self.job_id))
                .await
                .map_err(|_| ApiError::Timeout(limit))?,
            None => self.api.fetch_status(&self.job_id).await,
        }
    }
}
