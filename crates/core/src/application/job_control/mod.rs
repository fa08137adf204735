// Job Controller - user-facing lifecycle operations on export jobs

pub mod create;


pub use create::{validate_request, CreateExportRequest};

use crate::application::availability::ensure_async_capable;
use crate::domain::{Artifact, ArtifactId, ExportJob, ExportState, JobId, ResultLocator};
use crate::error::{AppError, Result};
use crate::port::{
    BlobStore, ExecutionEngine, ExportJobRepository, ExportTask, IdProvider, TimeProvider,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Returned by `start` and `retry`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartReceipt {
    pub job_id: JobId,
    pub state: ExportState,
    pub execution_handle: Option<String>,
}

pub struct JobController {
    job_repo: Arc<dyn ExportJobRepository>,
    engine: Arc<dyn ExecutionEngine>,
    blob_store: Arc<dyn BlobStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl JobController {
    pub fn new(
        job_repo: Arc<dyn ExportJobRepository>,
        engine: Arc<dyn ExecutionEngine>,
        blob_store: Arc<dyn BlobStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            job_repo,
            engine,
            blob_store,
            id_provider,
            time_provider,
        }
    }

    /// Whether `start`/`retry` can currently succeed
    pub fn is_async_capable(&self) -> bool {
        self.engine.is_async_capable()
    }

    /// Insert a new Pending job
    pub async fn create(&self, req: CreateExportRequest) -> Result<ExportJob> {
        let job = create::build_job(self.id_provider.as_ref(), self.time_provider.as_ref(), req)?;
        self.job_repo.insert(&job).await?;
        info!(job_id = %job.id, model = %job.model_name, records = job.record_ids.len(), "Export job created");
        Ok(job)
    }

    /// Pending -> Processing, then hand the job to the engine
    pub async fn start(&self, id: &JobId) -> Result<StartReceipt> {
        ensure_async_capable(self.engine.as_ref())?;

        let pending = self.load(id).await?;
        let mut processing = pending.clone();
        processing.start(self.time_provider.now_millis())?;

        self.launch(&pending, processing).await
    }

    /// Failed -> Pending -> Processing, clearing the previous attempt
    pub async fn retry(&self, id: &JobId) -> Result<StartReceipt> {
        ensure_async_capable(self.engine.as_ref())?;

        let failed = self.load(id).await?;
        let mut processing = failed.clone();
        processing.reset_for_retry()?;
        processing.start(self.time_provider.now_millis())?;

        info!(job_id = %id, "Retrying export job");
        self.launch(&failed, processing).await
    }

    /// Mark a Pending or Processing job as cancelled
    ///
    /// A running execution is not interrupted and may still record its own outcome.
    pub async fn cancel(&self, id: &JobId) -> Result<ExportJob> {
        let mut job = self.load(id).await?;
        let was_processing = job.state == ExportState::Processing;
        job.cancel(self.time_provider.now_millis())?;
        self.job_repo.update(&job).await?;

        if was_processing {
            warn!(job_id = %id, "Export job cancelled while processing; running execution is not interrupted");
        } else {
            info!(job_id = %id, "Export job cancelled");
        }
        Ok(job)
    }

    /// Download locator for a finished job
    pub async fn fetch_result(&self, id: &JobId) -> Result<ResultLocator> {
        let job = self.load(id).await?;
        match job.result_artifact_id {
            Some(artifact_id) => Ok(ResultLocator {
                artifact_id,
                file_name: job.artifact_file_name(),
                url: self.blob_store.url_for(artifact_id),
            }),
            None => Err(AppError::NoResult(format!(
                "No result file available for job {}",
                id
            ))),
        }
    }

    /// Stored artifact content
    pub async fn download(&self, artifact_id: ArtifactId) -> Result<Artifact> {
        self.blob_store
            .fetch(artifact_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Artifact {} not found", artifact_id)))
    }

    pub async fn get(&self, id: &JobId) -> Result<ExportJob> {
        self.load(id).await
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<ExportJob>> {
        self.job_repo.list_recent(limit).await
    }

    /// Job counts for every state
    pub async fn state_counts(&self) -> Result<Vec<(ExportState, i64)>> {
        let mut counts = Vec::with_capacity(4);
        for state in [
            ExportState::Pending,
            ExportState::Processing,
            ExportState::Done,
            ExportState::Failed,
        ] {
            counts.push((state, self.job_repo.count_by_state(state).await?));
        }
        Ok(counts)
    }

    async fn load(&self, id: &JobId) -> Result<ExportJob> {
        self.job_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))
    }

    // Processing is persisted before enqueue so a fast worker always sees it.
    // On enqueue failure the previous row is written back.
    async fn launch(&self, previous: &ExportJob, processing: ExportJob) -> Result<StartReceipt> {
        self.job_repo.update(&processing).await?;

        let handle = match self.engine.enqueue(ExportTask::for_job(&processing)).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(job_id = %processing.id, error = %e, "Enqueue failed, restoring job");
                if let Err(restore) = self.job_repo.update(previous).await {
                    error!(job_id = %processing.id, error = %restore, "Failed to restore job after enqueue failure");
                }
                return Err(e.into());
            }
        };

        self.job_repo
            .set_execution_handle(&processing.id, handle.uuid.as_deref())
            .await?;

        info!(
            job_id = %processing.id,
            handle = ?handle.uuid,
            "Export job queued"
        );

        Ok(StartReceipt {
            job_id: processing.id,
            state: ExportState::Processing,
            execution_handle: handle.uuid,
        })
    }
}
