//! In-memory job service that replays scripted responses.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use quantview::{ApiError, Job, JobApi, JobId};

/// A request the service received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Submit(String),
    Status(String),
    List,
}

struct Step {
    delay: Duration,
    response: Result<Job, ApiError>,
}

/// Scripted `JobApi`.
///
/// Each submission and each status fetch of a job pops the next scripted
/// step; a step may be delayed to simulate a slow response. Running out of
/// script yields a transport error.
#[derive(Default)]
pub struct ScriptedJobApi {
    submits: Mutex<VecDeque<Step>>,
    statuses: Mutex<HashMap<String, VecDeque<Step>>>,
    history: Mutex<Option<Vec<Job>>>,
    calls: Mutex<Vec<Call>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedJobApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_submit(self, job: Job) -> Self {
        self.on_submit_after(Duration::ZERO, Ok(job))
    }

    pub fn on_submit_after(self, delay: Duration, response: Result<Job, ApiError>) -> Self {
        lock(&self.submits).push_back(Step { delay, response });
        self
    }

    pub fn on_status(self, job: Job) -> Self {
        let id = job.id().to_string();
        self.on_status_after(&id, Duration::ZERO, Ok(job))
    }

    pub fn on_status_error(self, job_id: &str, error: ApiError) -> Self {
        self.on_status_after(job_id, Duration::ZERO, Err(error))
    }

    pub fn on_status_after(
        self,
        job_id: &str,
        delay: Duration,
        response: Result<Job, ApiError>,
    ) -> Self {
        lock(&self.statuses)
            .entry(job_id.to_string())
            .or_default()
            .push_back(Step { delay, response });
        self
    }

    /// Jobs returned by the history listing. Without this the listing fails.
    pub fn with_history(self, jobs: Vec<Job>) -> Self {
        *lock(&self.history) = Some(jobs);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Number of status fetches issued for `job_id`.
    pub fn status_calls(&self, job_id: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| matches!(call, Call::Status(id) if id == job_id))
            .count()
    }

    async fn play(step: Option<Step>, missing: String) -> Result<Job, ApiError> {
        match step {
            Some(step) => {
                if !step.delay.is_zero() {
                    tokio::time::sleep(step.delay).await;
                }
                step.response
            }
            None => Err(ApiError::Transport(missing)),
        }
    }
}

#[async_trait]
impl JobApi for ScriptedJobApi {
    async fn submit(&self, ticker: &str) -> quantview::client::Result<Job> {
        lock(&self.calls).push(Call::Submit(ticker.to_string()));
        let step = lock(&self.submits).pop_front();
        Self::play(step, format!("no submission scripted for {}", ticker)).await
    }

    async fn fetch_status(&self, job_id: &JobId) -> quantview::client::Result<Job> {
        lock(&self.calls).push(Call::Status(job_id.to_string()));
        let step = lock(&self.statuses)
            .get_mut(job_id.as_str())
            .and_then(VecDeque::pop_front);
        Self::play(step, format!("no status scripted for job {}", job_id)).await
    }

    async fn list_jobs(&self) -> quantview::client::Result<Vec<Job>> {
        lock(&self.calls).push(Call::List);
        lock(&self.history)
            .clone()
            .ok_or_else(|| ApiError::Transport("history unavailable".to_string()))
    }
}
