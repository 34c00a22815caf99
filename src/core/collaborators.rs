use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::job::{JobId, ProductionJob};
use crate::err::Result;

/// Source of truth for the job list. Queried once per tick; the driver never
/// caches jobs across ticks.
#[async_trait]
pub trait JobSource: Send + Sync + 'static {
    async fn snapshot(&self) -> Result<Vec<ProductionJob>>;
}

/// Downstream stock registration, one call per job per tick covering every
/// unit detected in that tick.
#[async_trait]
pub trait StockCreator: Send + Sync + 'static {
    async fn create_stock(&self, job: &ProductionJob, units: u32) -> Result<()>;
}

/// Write-back of a job's cumulative completed output.
#[async_trait]
pub trait OutputPersister: Send + Sync + 'static {
    async fn persist_actual_output(&self, job_id: JobId, cumulative_units: u32) -> Result<()>;
}

/// Operator-facing announcements. Synchronous so a slow sink can never stall
/// a tick; implementations that need IO should enqueue internally.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, message: &str);
}

/// Everything the tick driver talks to. Cloning is shallow.
#[derive(Clone)]
pub struct Collaborators {
    pub jobs: Arc<dyn JobSource>,
    pub stock: Arc<dyn StockCreator>,
    pub output: Arc<dyn OutputPersister>,
    pub notifier: Arc<dyn Notifier>,
}

/// Job list held in memory, for the demo binary and tests. Writes through
/// `set_jobs` and `apply_actual_output` become visible to the next snapshot.
#[derive(Debug, Default)]
pub struct MemoryJobSource {
    jobs: RwLock<Vec<ProductionJob>>,
}

impl MemoryJobSource {
    pub fn new(initial: Vec<ProductionJob>) -> Self {
        Self {
            jobs: RwLock::new(initial),
        }
    }

    pub async fn set_jobs(&self, jobs: Vec<ProductionJob>) {
        *self.jobs.write().await = jobs;
    }

    pub async fn apply_actual_output(&self, job_id: JobId, cumulative_units: u32) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.iter_mut().find(|job| job.id == job_id) {
            job.actual_output = cumulative_units;
        }
    }
}

#[async_trait]
impl JobSource for MemoryJobSource {
    async fn snapshot(&self) -> Result<Vec<ProductionJob>> {
        Ok(self.jobs.read().await.clone())
    }
}
