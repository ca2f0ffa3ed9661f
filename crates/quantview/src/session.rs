//! Ties the client, the store and the scheduler together the way a front
//! end drives them: one submit form, one job card, one history panel.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};

use crate::client::{normalize_ticker, ApiError, ErrorKind, HttpJobClient, JobApi};
use crate::config::ClientConfig;
use crate::history::HistoryPanel;
use crate::job::{Job, JobId};
use crate::scheduler::{BindingState, PollBinding, PollConfig, PollScheduler, StopReason};
use crate::store::{JobStore, StoreError, ViewError, WriteOutcome};

/// What became of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The job was created and is being polled.
    Tracking(JobId),
    /// The job was created already finished; nothing to poll.
    Finished(JobId),
    /// Creating the job failed; the classified error is in the view.
    Failed(ErrorKind),
    /// Something newer replaced this submission before it completed.
    Superseded,
}

pub struct JobSession {
    api: Arc<dyn JobApi>,
    store: Arc<JobStore>,
    scheduler: PollScheduler,
    history: HistoryPanel,
    binding: Mutex<Option<PollBinding>>,
}

impl JobSession {
    pub fn new(api: Arc<dyn JobApi>, poll: PollConfig) -> Self {
        Self::with_store(api, Arc::new(JobStore::new()), poll)
    }

    pub fn with_store(api: Arc<dyn JobApi>, store: Arc<JobStore>, poll: PollConfig) -> Self {
        Self {
            scheduler: PollScheduler::new(Arc::clone(&api), Arc::clone(&store), poll),
            history: HistoryPanel::new(Arc::clone(&api), Arc::clone(&store)),
            api,
            store,
            binding: Mutex::new(None),
        }
    }

    /// Builds a session talking HTTP to the configured service.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = HttpJobClient::from_config(config)?;
        Ok(Self::new(Arc::new(client), PollConfig::from_config(config)))
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn history(&self) -> &HistoryPanel {
        &self.history
    }

    fn slot(&self) -> MutexGuard<'_, Option<PollBinding>> {
        match self.binding.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// False while a submission or polling is in progress.
    pub fn can_submit(&self) -> bool {
        !self.store.snapshot().is_busy()
    }

    /// Submits an analysis for `raw_ticker` and starts tracking it.
    ///
    /// An empty ticker is rejected before anything changes. Any job
    /// tracked so far is superseded as soon as the request goes out.
    pub async fn submit(&self, raw_ticker: &str) -> Result<SubmitOutcome, ApiError> {
        let ticker = normalize_ticker(raw_ticker)?;
        let generation = self.store.begin_submission();
        self.release_stale_binding();
        info!("Submitting analysis for {} (generation {})", ticker, generation);

        let job = match self.api.submit(&ticker).await {
            Ok(job) => job,
            Err(e) => {
                warn!("Failed to create job for {}: {}", ticker, e);
                let kind = e.kind();
                return Ok(
                    match self.store.set_error(generation, ViewError::submission(&e)) {
                        WriteOutcome::Superseded => SubmitOutcome::Superseded,
                        _ => SubmitOutcome::Failed(kind),
                    },
                );
            }
        };

        let job_id = job.id().clone();
        if self.store.set_job(generation, job.clone()) == WriteOutcome::Superseded {
            debug!("Created job {} arrived after it was superseded", job_id);
            return Ok(SubmitOutcome::Superseded);
        }
        if job.is_terminal() {
            return Ok(SubmitOutcome::Finished(job_id));
        }

        let mut binding = self.scheduler.bind(generation, &job);
        binding.start();

        let mut slot = self.slot();
        if !self.store.is_current(generation) {
            // The binding sees the new generation and stops on its own.
            return Ok(SubmitOutcome::Superseded);
        }
        *slot = Some(binding);
        Ok(SubmitOutcome::Tracking(job_id))
    }

    /// Shows a finished job from history in place of whatever is tracked.
    ///
    /// The slot stays locked across the store write, so a submission that
    /// started afterwards cannot have its binding installed in between and
    /// then dropped here.
    pub fn select_historical(&self, job: Job) -> Result<(), StoreError> {
        let mut slot = self.slot();
        self.history.select(job)?;
        slot.take();
        Ok(())
    }

    /// Drops the held binding if its generation no longer owns the view.
    fn release_stale_binding(&self) {
        let mut slot = self.slot();
        let stale = slot
            .as_ref()
            .is_some_and(|binding| !self.store.is_current(binding.generation()));
        if stale {
            slot.take();
        }
    }

    pub fn active_binding_state(&self) -> Option<BindingState> {
        self.slot().as_ref().map(PollBinding::state)
    }

    pub fn active_job_id(&self) -> Option<JobId> {
        self.slot().as_ref().map(|binding| binding.job_id().clone())
    }

    /// Waits for the active binding to stop and releases it.
    pub async fn wait(&self) -> Option<StopReason> {
        let binding = self.slot().take()?;
        binding.join().await
    }

    /// Stops polling immediately.
    pub fn shutdown(&self) {
        if let Some(mut binding) = self.slot().take() {
            info!("Stopping polling of job {}", binding.job_id());
            binding.abort();
        }
    }
}

impl Drop for JobSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeApi {
        created: Mutex<VecDeque<crate::client::Result<Job>>>,
        statuses: Mutex<VecDeque<crate::client::Result<Job>>>,
        submits: AtomicUsize,
    }

    impl FakeApi {
        fn new(
            created: Vec<crate::client::Result<Job>>,
            statuses: Vec<crate::client::Result<Job>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                created: Mutex::new(created.into()),
                statuses: Mutex::new(statuses.into()),
                submits: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl JobApi for FakeApi {
        async fn submit(&self, _ticker: &str) -> crate::client::Result<Job> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            self.created
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Transport("no job scripted".into())))
        }

        async fn fetch_status(&self, _job_id: &JobId) -> crate::client::Result<Job> {
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Transport("no status scripted".into())))
        }

        async fn list_jobs(&self) -> crate::client::Result<Vec<Job>> {
            Ok(vec![])
        }
    }

    fn poll() -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(3),
            request_timeout: None,
        }
    }

    #[tokio::test]
    async fn test_empty_ticker_is_rejected_locally() {
        let api = FakeApi::new(vec![], vec![]);
        let session = JobSession::new(api.clone(), poll());

        let result = session.submit("   ").await;
        assert!(matches!(result, Err(ApiError::InvalidTicker)));
        assert_eq!(api.submits.load(Ordering::SeqCst), 0);
        assert_eq!(session.store().generation(), 0);
        assert!(session.can_submit());
    }

    #[tokio::test]
    async fn test_submit_failure_is_classified() {
        let api = FakeApi::new(
            vec![Err(ApiError::Service {
                status: 500,
                message: "Internal Server Error".into(),
            })],
            vec![],
        );
        let session = JobSession::new(api, poll());

        let outcome = session.submit("reliance.ns").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Failed(ErrorKind::Service));

        let view = session.store().snapshot();
        assert!(view.current_job.is_none());
        assert!(!view.is_busy());
        assert_eq!(view.last_error.unwrap().kind, ErrorKind::Service);
        assert!(session.active_binding_state().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_tracks_job_to_success() {
        let api = FakeApi::new(
            vec![Ok(Job::pending("j1", "TCS.NS"))],
            vec![
                Ok(Job::from_parts("j1", "TCS.NS", JobStatus::DataFetching, None)),
                Ok(Job::from_parts(
                    "j1",
                    "TCS.NS",
                    JobStatus::Success,
                    Some(json!({ "company_name": "Tata Consultancy Services" })),
                )),
            ],
        );
        let session = JobSession::new(api, poll());

        let outcome = session.submit(" tcs.ns ").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Tracking(JobId::from("j1")));
        assert!(!session.can_submit());
        assert_eq!(session.active_job_id(), Some(JobId::from("j1")));
        assert_eq!(session.active_binding_state(), Some(BindingState::Active));

        assert_eq!(session.wait().await, Some(StopReason::Terminal));
        let view = session.store().snapshot();
        let job = view.current_job.unwrap();
        assert_eq!(job.ticker(), "TCS.NS");
        assert_eq!(job.status(), &JobStatus::Success);
        assert!(session.can_submit());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_historical_releases_binding() {
        let api = FakeApi::new(vec![Ok(Job::pending("j1", "TCS.NS"))], vec![]);
        let session = JobSession::new(api, poll());
        session.submit("TCS.NS").await.unwrap();

        let old = Job::from_parts(
            "j0",
            "INFY.NS",
            JobStatus::Failed,
            Some(json!({ "error": "delisted" })),
        );
        session.select_historical(old).unwrap();

        assert!(session.active_binding_state().is_none());
        let view = session.store().snapshot();
        assert_eq!(view.current_job.unwrap().id().as_str(), "j0");
        assert!(session.can_submit());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_after_selection_keeps_its_binding() {
        let api = FakeApi::new(
            vec![
                Ok(Job::pending("j1", "TCS.NS")),
                Ok(Job::pending("j2", "SBIN.NS")),
            ],
            vec![Ok(Job::from_parts(
                "j2",
                "SBIN.NS",
                JobStatus::Success,
                Some(json!({ "company_name": "State Bank of India" })),
            ))],
        );
        let session = JobSession::new(api, poll());
        session.submit("TCS.NS").await.unwrap();

        let old = Job::from_parts(
            "j0",
            "INFY.NS",
            JobStatus::Failed,
            Some(json!({ "error": "delisted" })),
        );
        session.select_historical(old).unwrap();

        let outcome = session.submit("SBIN.NS").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Tracking(JobId::from("j2")));
        assert_eq!(session.active_job_id(), Some(JobId::from("j2")));
        assert_eq!(session.active_binding_state(), Some(BindingState::Active));
        assert_eq!(session.wait().await, Some(StopReason::Terminal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_keeps_current_binding() {
        let api = FakeApi::new(vec![Ok(Job::pending("j1", "TCS.NS"))], vec![]);
        let session = JobSession::new(api, poll());
        session.submit("TCS.NS").await.unwrap();

        session.release_stale_binding();
        assert_eq!(session.active_job_id(), Some(JobId::from("j1")));

        session.store().begin_submission();
        session.release_stale_binding();
        assert!(session.active_job_id().is_none());
    }

    #[tokio::test]
    async fn test_already_finished_job_is_not_polled() {
        let api = FakeApi::new(
            vec![Ok(Job::from_parts(
                "j2",
                "INFY.NS",
                JobStatus::Failed,
                Some(json!({ "error": "bad symbol" })),
            ))],
            vec![],
        );
        let session = JobSession::new(api, poll());

        let outcome = session.submit("INFY.NS").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Finished(JobId::from("j2")));
        assert!(session.active_binding_state().is_none());
        assert!(!session.store().snapshot().is_busy());
    }
}
