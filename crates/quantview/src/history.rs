//! History of finished analyses and the path that loads one into view.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{info, warn};

use crate::client::JobApi;
use crate::job::{Job, JobId};
use crate::store::{JobStore, StoreError};

#[derive(Debug, Default)]
struct PanelState {
    open: bool,
    loading: bool,
    entries: Vec<Job>,
}

/// Lists finished jobs and swaps a selected one into the job view.
///
/// History is supplementary: a failed listing leaves the panel empty and
/// never touches the primary view's error state.
pub struct HistoryPanel {
    api: Arc<dyn JobApi>,
    store: Arc<JobStore>,
    state: RwLock<PanelState>,
}

impl HistoryPanel {
    pub fn new(api: Arc<dyn JobApi>, store: Arc<JobStore>) -> Self {
        Self {
            api,
            store,
            state: RwLock::new(PanelState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PanelState> {
        match self.state.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, PanelState> {
        match self.state.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Opens the panel and refreshes its entries. Returns how many
    /// finished jobs are listed.
    pub async fn open(&self) -> usize {
        {
            let mut state = self.write();
            state.open = true;
            state.loading = true;
        }

        let entries = match self.api.list_jobs().await {
            Ok(jobs) => jobs.into_iter().filter(Job::is_terminal).collect(),
            Err(e) => {
                warn!("Failed to fetch history: {}", e);
                Vec::new()
            }
        };

        let mut state = self.write();
        state.loading = false;
        state.entries = entries;
        state.entries.len()
    }

    /// Opens (and refreshes) a closed panel, closes an open one.
    pub async fn toggle(&self) {
        let was_open = self.read().open;
        if was_open {
            self.close();
        } else {
            self.open().await;
        }
    }

    pub fn close(&self) {
        self.write().open = false;
    }

    pub fn is_open(&self) -> bool {
        self.read().open
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    /// The listed jobs, in the order the service returned them.
    pub fn entries(&self) -> Vec<Job> {
        self.read().entries.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Looks up a listed job by id.
    pub fn find(&self, job_id: &JobId) -> Option<Job> {
        self.read()
            .entries
            .iter()
            .find(|job| job.id() == job_id)
            .cloned()
    }

    /// Loads `job` into the view, cancelling any polling in progress, and
    /// closes the panel.
    pub fn select(&self, job: Job) -> Result<(), StoreError> {
        let job_id = job.id().clone();
        self.store.select_historical(job)?;
        info!("Selected job {} from history", job_id);
        self.close();
        Ok(())
    }
}
