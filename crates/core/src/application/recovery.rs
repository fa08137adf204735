// Crash recovery: jobs left in PROCESSING by a previous daemon run are handed to the engine again
use crate::domain::ExportState;
use crate::port::{ExecutionEngine, ExportJobRepository, ExportTask};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Startup recovery service
///
/// An in-process engine loses its queue on shutdown, so any job persisted as
/// PROCESSING has no execution behind it. Re-enqueueing is safe because the
/// executor only runs jobs that are still PROCESSING.
pub struct RecoveryService {
    job_repo: Arc<dyn ExportJobRepository>,
    engine: Arc<dyn ExecutionEngine>,
}

impl RecoveryService {
    pub fn new(job_repo: Arc<dyn ExportJobRepository>, engine: Arc<dyn ExecutionEngine>) -> Self {
        Self { job_repo, engine }
    }

    /// Re-enqueue every PROCESSING job
    ///
    /// # Returns
    /// Number of jobs re-enqueued
    pub async fn requeue_orphaned(&self) -> crate::error::Result<usize> {
        if !self.engine.is_async_capable() {
            warn!("Async execution disabled, PROCESSING jobs stay as they are");
            return Ok(0);
        }

        let orphaned = self.job_repo.find_by_state(ExportState::Processing).await?;
        info!(count = orphaned.len(), "Starting orphaned export recovery");

        let mut requeued = 0;
        for job in orphaned {
            match self.engine.enqueue(ExportTask::for_job(&job)).await {
                Ok(handle) => {
                    self.job_repo
                        .set_execution_handle(&job.id, handle.uuid.as_deref())
                        .await?;
                    info!(job_id = %job.id, handle = ?handle.uuid, "Export job requeued after restart");
                    requeued += 1;
                }
                Err(e) => {
                    error!(job_id = %job.id, error = %e, "Failed to requeue orphaned export job");
                }
            }
        }

        info!(requeued_count = requeued, "Orphaned export recovery complete");
        Ok(requeued)
    }
}
