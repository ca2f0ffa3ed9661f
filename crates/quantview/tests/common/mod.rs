//! Shared test utilities for quantview integration tests.
//!
//! This module provides:
//! - `ScriptedJobApi`, an in-memory job service replaying scripted responses
//! - Builders for job snapshots
//! - `wait_for`, which blocks until the job view satisfies a predicate

pub mod builders;
pub mod scripted_api;

pub use builders::*;
pub use scripted_api::{Call, ScriptedJobApi};

use std::time::Duration;

use quantview::{JobStore, JobViewState};

/// Waits until the view satisfies `predicate` and returns that view.
///
/// Panics after `limit` of (possibly paused) time.
#[allow(dead_code)]
pub async fn wait_for<F>(store: &JobStore, limit: Duration, predicate: F) -> JobViewState
where
    F: Fn(&JobViewState) -> bool,
{
    let mut changes = store.subscribe();
    let current = store.snapshot();
    if predicate(&current) {
        return current;
    }

    tokio::time::timeout(limit, async {
        loop {
            match changes.recv().await {
                Ok(view) if predicate(&view) => return view,
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                    let view = store.snapshot();
                    if predicate(&view) {
                        return view;
                    }
                }
                Err(e) => panic!("job view channel closed: {}", e),
            }
        }
    })
    .await
    .expect("job view never reached the expected state")
}
