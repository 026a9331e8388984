//! The run registry: the one piece of additional shared mutable state
//! the HTTP front end carries beyond what the core tracks on disk.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use flowd_core::{EngineError, StepResult};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub job_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

pub struct RunHandle {
    pub summary: RunSummary,
    pub cancel: CancellationToken,
}

#[derive(Default)]
pub struct RunRegistry {
    runs: RwLock<HashMap<String, RunHandle>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, run_id: String, job_id: String, cancel: CancellationToken) {
        let summary = RunSummary {
            run_id: run_id.clone(),
            job_id,
            status: RunStatus::Queued,
            started_at: Utc::now(),
            finished_at: None,
        };
        self.runs.write().await.insert(run_id, RunHandle { summary, cancel });
    }

    pub async fn mark_running(&self, run_id: &str) {
        if let Some(handle) = self.runs.write().await.get_mut(run_id) {
            handle.summary.status = RunStatus::Running;
        }
    }

    pub async fn mark_finished(&self, run_id: &str, results: Result<&[StepResult], &EngineError>) {
        if let Some(handle) = self.runs.write().await.get_mut(run_id) {
            handle.summary.status = match results {
                Ok(steps) if steps.iter().all(|s| s.status == "completed") => RunStatus::Completed,
                Ok(_) | Err(_) => RunStatus::Failed,
            };
            handle.summary.finished_at = Some(Utc::now());
        }
    }

    pub async fn mark_cancelled(&self, run_id: &str) {
        if let Some(handle) = self.runs.write().await.get_mut(run_id) {
            handle.summary.status = RunStatus::Cancelled;
            handle.summary.finished_at = Some(Utc::now());
        }
    }

    pub async fn cancel(&self, run_id: &str) -> bool {
        if let Some(handle) = self.runs.read().await.get(run_id) {
            handle.cancel.cancel();
            true
        } else {
            false
        }
    }

    pub async fn get(&self, run_id: &str) -> Option<RunSummary> {
        self.runs.read().await.get(run_id).map(|h| h.summary.clone())
    }

    pub async fn list(&self) -> Vec<RunSummary> {
        let mut out: Vec<RunSummary> = self.runs.read().await.values().map(|h| h.summary.clone()).collect();
        out.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        out
    }
}

pub type SharedRegistry = Arc<RunRegistry>;
