// Batch Executor - runs one export job out of band

use super::artifact::{render_json, JSON_CONTENT_TYPE};
use super::batch::{effective_batch_size, project_in_batches};
use super::parser::resolve_parser;
use super::ExportError;
use crate::application::callback::CallbackDispatcher;
use crate::domain::{
    ArtifactId, ArtifactOwner, ExportJob, ExportState, JobId, NewArtifact, JOB_COLLECTION,
};
use crate::error::{AppError, Result};
use crate::port::{BlobStore, ExportJobRepository, Projector, RecordStore, TemplateStore, TimeProvider};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What a single invocation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Job is Done with this many exported records
    Completed { count: u64 },
    /// Job was not in Processing when picked up; nothing was written
    Skipped { state: ExportState },
}

struct ExportOutput {
    artifact_id: ArtifactId,
    count: u64,
}

/// Executes export jobs: resolve, project in batches, store artifact, record outcome
pub struct BatchExecutor {
    job_repo: Arc<dyn ExportJobRepository>,
    record_store: Arc<dyn RecordStore>,
    template_store: Arc<dyn TemplateStore>,
    projector: Arc<dyn Projector>,
    blob_store: Arc<dyn BlobStore>,
    callbacks: Arc<CallbackDispatcher>,
    time_provider: Arc<dyn TimeProvider>,
}

impl BatchExecutor {
    pub fn new(
        job_repo: Arc<dyn ExportJobRepository>,
        record_store: Arc<dyn RecordStore>,
        template_store: Arc<dyn TemplateStore>,
        projector: Arc<dyn Projector>,
        blob_store: Arc<dyn BlobStore>,
        callbacks: Arc<CallbackDispatcher>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            job_repo,
            record_store,
            template_store,
            projector,
            blob_store,
            callbacks,
            time_provider,
        }
    }

    /// Execute one job
    ///
    /// Only a job persisted as Processing is run; anything else (cancelled before
    /// pickup, already finished) is skipped without writes, which makes engine
    /// re-deliveries harmless. Concurrent invocations for the same job are not
    /// deduplicated here: the last write wins.
    ///
    /// On failure the job is recorded as Failed and the error is still returned so
    /// the engine can observe it.
    pub async fn execute(&self, job_id: &JobId) -> Result<ExecutionOutcome> {
        let job = self
            .job_repo
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

        if job.state != ExportState::Processing {
            info!(
                job_id = %job.id,
                state = %job.state,
                "Skipping export job that is not processing"
            );
            return Ok(ExecutionOutcome::Skipped { state: job.state });
        }

        info!(job_id = %job.id, model = %job.model_name, "Starting JSON export job");

        match self.run(&job).await {
            Ok(done) => {
                self.callbacks.dispatch(&done).await;
                let count = done.result_count.unwrap_or_default();
                info!(job_id = %done.id, count = count, "Completed JSON export job");
                Ok(ExecutionOutcome::Completed { count })
            }
            Err(err) => {
                error!(job_id = %job.id, error = %err, "Failed JSON export job");
                self.record_failure(&job, &err).await;
                Err(AppError::Export(err))
            }
        }
    }

    // Steps up to and including the Done write; every error funnels into one Failed write
    async fn run(&self, job: &ExportJob) -> std::result::Result<ExportJob, ExportError> {
        let output = self.export(job).await?;

        let mut done = job.clone();
        done.complete(self.time_provider.now_millis(), output.artifact_id, output.count)
            .map_err(|e| ExportError::Storage(e.to_string()))?;
        self.job_repo.update(&done).await?;
        Ok(done)
    }

    async fn export(&self, job: &ExportJob) -> std::result::Result<ExportOutput, ExportError> {
        let ids = self
            .record_store
            .filter_existing(&job.model_name, &job.record_ids)
            .await?;
        if ids.is_empty() {
            return Err(ExportError::NoRecords);
        }

        let parser = resolve_parser(
            self.template_store.as_ref(),
            job.export_template_id,
            job.parser.as_ref(),
        )
        .await?;

        let batch_size = effective_batch_size(job.batch_size);
        let rows = project_in_batches(
            self.record_store.as_ref(),
            self.projector.as_ref(),
            &job.model_name,
            &ids,
            &parser,
            job.with_field_names,
            batch_size,
            |processed, total| {
                info!(
                    job_id = %job.id,
                    processed = processed,
                    total = total,
                    "Processed {}/{} records",
                    processed,
                    total
                );
            },
        )
        .await?;

        let content = render_json(&rows)?;
        let artifact_id = self
            .blob_store
            .store(NewArtifact {
                name: job.artifact_file_name(),
                content_type: JSON_CONTENT_TYPE.to_string(),
                content,
                owner: ArtifactOwner {
                    collection: JOB_COLLECTION.to_string(),
                    id: job.id.clone(),
                },
            })
            .await?;

        Ok(ExportOutput {
            artifact_id,
            count: rows.len() as u64,
        })
    }

    /// Mark a job Failed after its execution died without reporting back
    ///
    /// Only a job still persisted as Processing is touched.
    pub async fn record_abort(&self, job_id: &JobId, reason: &str) -> Result<()> {
        let Some(job) = self.job_repo.find_by_id(job_id).await? else {
            return Ok(());
        };
        if job.state != ExportState::Processing {
            return Ok(());
        }

        let mut failed = job;
        failed.fail(self.time_provider.now_millis(), reason)?;
        self.job_repo.update(&failed).await?;
        warn!(job_id = %job_id, reason = %reason, "Export job aborted");
        Ok(())
    }

    async fn record_failure(&self, job: &ExportJob, err: &ExportError) {
        let mut failed = job.clone();
        if let Err(e) = failed.fail(self.time_provider.now_millis(), err.to_string()) {
            error!(job_id = %job.id, error = %e, "Cannot mark export job as failed");
            return;
        }
        if let Err(e) = self.job_repo.update(&failed).await {
            warn!(job_id = %job.id, error = %e, "Failed to persist export failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::callback::CallbackRegistry;
    use crate::domain::CallbackTarget;
    use crate::port::blob_store::mocks::InMemoryBlobStore;
    use crate::port::export_job_repository::mocks::InMemoryExportJobRepository;
    use crate::port::projector::mocks::EchoProjector;
    use crate::port::record_store::mocks::InMemoryRecordStore;
    use crate::port::template_store::mocks::InMemoryTemplateStore;
    use crate::port::time_provider::mocks::SteppingClock;
    use serde_json::json;
    use std::sync::Mutex;

    struct Fixture {
        repo: Arc<InMemoryExportJobRepository>,
        records: Arc<InMemoryRecordStore>,
        templates: Arc<InMemoryTemplateStore>,
        projector: Arc<EchoProjector>,
        blobs: Arc<InMemoryBlobStore>,
        executor: BatchExecutor,
    }

    fn fixture_with(projector: EchoProjector, registry: CallbackRegistry) -> Fixture {
        let repo = Arc::new(InMemoryExportJobRepository::new());
        let records = Arc::new(InMemoryRecordStore::new());
        let templates = Arc::new(InMemoryTemplateStore::new());
        let projector = Arc::new(projector);
        let blobs = Arc::new(InMemoryBlobStore::new());
        let executor = BatchExecutor::new(
            repo.clone(),
            records.clone(),
            templates.clone(),
            projector.clone(),
            blobs.clone(),
            Arc::new(CallbackDispatcher::new(Arc::new(registry))),
            Arc::new(SteppingClock::new(10_000, 10)),
        );
        Fixture {
            repo,
            records,
            templates,
            projector,
            blobs,
            executor,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(EchoProjector::new(), CallbackRegistry::new())
    }

    async fn processing_job(fx: &Fixture, ids: Vec<i64>, batch_size: i64) -> ExportJob {
        let mut job = ExportJob::new("job-1", 1_000, "Partners", "res.partner", ids);
        job.batch_size = batch_size;
        job.with_field_names = true;
        job.parser = Some(json!(["id", "name"]));
        job.start(5_000).unwrap();
        fx.repo.insert(&job).await.unwrap();
        job
    }

    #[tokio::test]
    async fn test_three_records_in_batches_of_two() {
        let fx = fixture();
        fx.records.seed("res.partner", &[1, 2, 3], "Partner");
        processing_job(&fx, vec![1, 2, 3], 2).await;

        let outcome = fx.executor.execute(&"job-1".to_string()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed { count: 3 });
        assert_eq!(fx.projector.batch_sizes(), vec![2, 1]);

        let job = fx.repo.get("job-1").unwrap();
        assert_eq!(job.state, ExportState::Done);
        assert_eq!(job.result_count, Some(3));
        assert!(job.result_artifact_id.is_some());
        assert!(job.completed_at.unwrap() >= job.started_at.unwrap());

        let artifacts = fx.blobs.artifacts();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].name, "Partners.json");
        assert_eq!(artifacts[0].content_type, "application/json");
        assert_eq!(artifacts[0].owner.collection, "jsonify.job");
        assert_eq!(artifacts[0].owner.id, "job-1");

        let rows: Vec<serde_json::Value> = serde_json::from_slice(&artifacts[0].content).unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_missing_records_are_dropped_silently() {
        let fx = fixture();
        fx.records.seed("res.partner", &[1, 3], "Partner");
        processing_job(&fx, vec![3, 2, 1], 100).await;

        let outcome = fx.executor.execute(&"job-1".to_string()).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed { count: 2 });

        let rows: Vec<serde_json::Value> =
            serde_json::from_slice(&fx.blobs.artifacts()[0].content).unwrap();
        assert_eq!(rows[0]["id"], 3);
        assert_eq!(rows[1]["id"], 1);
    }

    #[tokio::test]
    async fn test_empty_input_fails_with_no_records() {
        let fx = fixture();
        processing_job(&fx, vec![], 100).await;

        let err = fx.executor.execute(&"job-1".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::Export(ExportError::NoRecords)));

        let job = fx.repo.get("job-1").unwrap();
        assert_eq!(job.state, ExportState::Failed);
        assert_eq!(
            job.error_message.as_deref(),
            Some("No valid records found for export.")
        );
        assert!(job.result_count.is_none());
        assert!(job.result_artifact_id.is_none());
        assert!(fx.blobs.artifacts().is_empty());
    }

    #[tokio::test]
    async fn test_all_ids_missing_fails_with_no_records() {
        let fx = fixture();
        processing_job(&fx, vec![40, 41], 100).await;

        let err = fx.executor.execute(&"job-1".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::Export(ExportError::NoRecords)));
    }

    #[tokio::test]
    async fn test_no_parser_fails() {
        let fx = fixture();
        fx.records.seed("res.partner", &[1], "Partner");
        let mut job = ExportJob::new("job-1", 1_000, "Partners", "res.partner", vec![1]);
        job.start(5_000).unwrap();
        fx.repo.insert(&job).await.unwrap();

        let err = fx.executor.execute(&job.id).await.unwrap_err();
        assert!(matches!(err, AppError::Export(ExportError::NoParser)));

        let stored = fx.repo.get("job-1").unwrap();
        assert_eq!(stored.state, ExportState::Failed);
        assert!(!stored.error_message.unwrap().is_empty());
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_template_parser_is_used() {
        let fx = fixture();
        fx.records.seed("res.partner", &[1], "Partner");
        let template_id = fx
            .templates
            .insert("Partner export", "res.partner", &json!(["name"]))
            .await
            .unwrap();
        let mut job = ExportJob::new("job-1", 1_000, "Partners", "res.partner", vec![1]);
        job.export_template_id = Some(template_id);
        job.start(5_000).unwrap();
        fx.repo.insert(&job).await.unwrap();

        let outcome = fx.executor.execute(&job.id).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed { count: 1 });
    }

    #[tokio::test]
    async fn test_projection_error_is_recorded_verbatim() {
        let fx = fixture_with(EchoProjector::failing_on_call(2), CallbackRegistry::new());
        fx.records.seed("res.partner", &[1, 2, 3], "Partner");
        processing_job(&fx, vec![1, 2, 3], 2).await;

        let err = fx.executor.execute(&"job-1".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::Export(ExportError::Projection(_))));

        let job = fx.repo.get("job-1").unwrap();
        assert_eq!(job.state, ExportState::Failed);
        assert_eq!(
            job.error_message.as_deref(),
            Some("Invalid parser: mock failure on call 2")
        );
        assert!(fx.blobs.artifacts().is_empty(), "no partial artifact");
    }

    #[tokio::test]
    async fn test_store_error_fails_job() {
        let fx = fixture();
        fx.records.seed("res.partner", &[1], "Partner");
        fx.blobs.fail_with("disk full");
        processing_job(&fx, vec![1], 100).await;

        assert!(fx.executor.execute(&"job-1".to_string()).await.is_err());
        let job = fx.repo.get("job-1").unwrap();
        assert_eq!(job.state, ExportState::Failed);
        assert!(job.error_message.unwrap().contains("disk full"));
    }

    #[tokio::test]
    async fn test_non_processing_job_is_skipped() {
        let fx = fixture();
        fx.records.seed("res.partner", &[1], "Partner");
        let mut job = processing_job(&fx, vec![1], 100).await;
        job.cancel(6_000).unwrap();
        fx.repo.update(&job).await.unwrap();
        let writes_before = fx.repo.update_count();

        let outcome = fx.executor.execute(&job.id).await.unwrap();
        assert_eq!(
            outcome,
            ExecutionOutcome::Skipped {
                state: ExportState::Failed
            }
        );
        assert_eq!(fx.repo.update_count(), writes_before);
        assert!(fx.repo.get("job-1").unwrap().is_cancelled());
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let fx = fixture();
        let err = fx.executor.execute(&"nope".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failing_callback_keeps_job_done() {
        let mut registry = CallbackRegistry::new();
        registry.register_fn("res.partner", "explode", |_, _| Err("callback broke".into()));
        let fx = fixture_with(EchoProjector::new(), registry);
        fx.records.seed("res.partner", &[1], "Partner");
        let mut job = ExportJob::new("job-1", 1_000, "Partners", "res.partner", vec![1]);
        job.parser = Some(json!(["name"]));
        job.callback = Some(CallbackTarget::new("res.partner", "explode", None));
        job.start(5_000).unwrap();
        fx.repo.insert(&job).await.unwrap();

        let outcome = fx.executor.execute(&job.id).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Completed { count: 1 });
        assert_eq!(fx.repo.get("job-1").unwrap().state, ExportState::Done);
    }

    #[tokio::test]
    async fn test_callback_receives_done_job() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let mut registry = CallbackRegistry::new();
        registry.register_fn("res.partner", "notify", move |record_id, job| {
            *sink.lock().unwrap() = Some((record_id, job.state, job.result_count));
            Ok(())
        });
        let fx = fixture_with(EchoProjector::new(), registry);
        fx.records.seed("res.partner", &[1, 2], "Partner");
        let mut job = ExportJob::new("job-1", 1_000, "Partners", "res.partner", vec![1, 2]);
        job.parser = Some(json!(["name"]));
        job.callback = Some(CallbackTarget::new("res.partner", "notify", Some(8)));
        job.start(5_000).unwrap();
        fx.repo.insert(&job).await.unwrap();

        fx.executor.execute(&job.id).await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            Some((Some(8), ExportState::Done, Some(2)))
        );
    }
}
