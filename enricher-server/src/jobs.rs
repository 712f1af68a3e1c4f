//! In-process job store
//!
//! Enrichment runs in the background: `submit` hands back an id right away
//! and the result is collected later with `poll`. Each job runs under a
//! deadline; finished jobs are pruned after the retention window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use enricher_core::{AggregateResult, Enricher};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

/// One submitted enrichment
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub indicator: String,
    pub status: JobStatus,
    pub result: Option<AggregateResult>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    fn pending(indicator: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            indicator,
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
}

pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
    timeout: Duration,
    retention: Duration,
}

impl JobStore {
    pub fn new(timeout: Duration, retention: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            timeout,
            retention,
        }
    }

    /// Queue an enrichment and return its id
    pub fn submit(self: &Arc<Self>, enricher: Arc<Enricher>, indicator: String) -> Uuid {
        let record = JobRecord::pending(indicator.clone());
        let id = record.id;
        self.jobs.write().insert(id, record);

        let store = Arc::clone(self);
        let timeout = self.timeout;
        tokio::spawn(async move {
            // Timing out drops the aggregation, aborting its provider calls
            let outcome = match tokio::time::timeout(timeout, enricher.handle(&indicator)).await {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("enrichment timed out after {}s", timeout.as_secs())),
            };
            store.finish(id, outcome);
        });

        tracing::debug!("Job {} queued", id);
        id
    }

    pub fn poll(&self, id: Uuid) -> Option<JobRecord> {
        self.jobs.read().get(&id).cloned()
    }

    /// Drop finished jobs older than the retention window
    pub fn prune(&self) -> usize {
        let cutoff = Utc::now() - chrono::Duration::from_std(self.retention).unwrap_or(chrono::Duration::zero());
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, job| job.finished_at.map(|at| at > cutoff).unwrap_or(true));
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    fn finish(&self, id: Uuid, outcome: Result<AggregateResult, String>) {
        let mut jobs = self.jobs.write();
        let Some(job) = jobs.get_mut(&id) else {
            return;
        };

        job.finished_at = Some(Utc::now());
        match outcome {
            Ok(result) => {
                job.status = JobStatus::Completed;
                job.result = Some(result);
                tracing::info!("Job {} completed", id);
            }
            Err(error) => {
                tracing::warn!("Job {} failed: {}", id, error);
                job.status = JobStatus::Failed;
                job.error = Some(error);
            }
        }
    }
}

/// Prune finished jobs once a minute for the life of the process
pub fn spawn_pruner(store: Arc<JobStore>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            let removed = store.prune();
            if removed > 0 {
                tracing::debug!("Pruned {} finished jobs", removed);
            }
        }
    });
}
