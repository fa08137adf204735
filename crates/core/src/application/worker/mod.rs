// Worker - drains the execution engine and runs the batch executor

pub mod constants;
mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::export::{BatchExecutor, ExecutionOutcome};
use crate::port::{ExportTask, TaskSource};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Worker pulling export tasks from a task source
pub struct Worker {
    name: String,
    tasks: Arc<dyn TaskSource>,
    executor: Arc<BatchExecutor>,
}

impl Worker {
    pub fn new(
        name: impl Into<String>,
        tasks: Arc<dyn TaskSource>,
        executor: Arc<BatchExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            tasks,
            executor,
        }
    }

    /// Run until shutdown is signalled or the task source is closed and drained
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(worker = %self.name, "Worker started");
        loop {
            if shutdown.is_shutdown() {
                info!(worker = %self.name, "Worker shutting down");
                break;
            }

            let task = tokio::select! {
                task = self.tasks.next_task() => task,
                _ = shutdown.wait() => {
                    info!(worker = %self.name, "Worker interrupted while idle");
                    break;
                }
            };

            match task {
                Some(task) => self.process(task).await,
                None => {
                    info!(worker = %self.name, "Task source closed");
                    break;
                }
            }
        }
        info!(worker = %self.name, "Worker stopped");
    }

    /// Execute one task in its own tokio task so a panic cannot take the worker down
    pub async fn process(&self, task: ExportTask) {
        info!(
            worker = %self.name,
            job_id = %task.job_id,
            channel = %task.channel,
            "Processing: {}",
            task.description
        );

        let executor = Arc::clone(&self.executor);
        let job_id = task.job_id.clone();
        let handle = tokio::task::spawn(async move { executor.execute(&job_id).await });

        match handle.await {
            Ok(Ok(ExecutionOutcome::Completed { count })) => {
                info!(job_id = %task.job_id, count = count, "Export task finished");
            }
            Ok(Ok(ExecutionOutcome::Skipped { state })) => {
                info!(job_id = %task.job_id, state = %state, "Export task skipped");
            }
            Ok(Err(e)) => {
                warn!(job_id = %task.job_id, error = %e, "Export task failed");
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    format!("Export task panicked: {}", panic_message(join_err.into_panic()))
                } else {
                    "Export task cancelled".to_string()
                };
                error!(job_id = %task.job_id, "{}", reason);

                // The executor never got to record an outcome
                if let Err(e) = self.executor.record_abort(&task.job_id, &reason).await {
                    error!(job_id = %task.job_id, error = %e, "Failed to mark aborted export job");
                }
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::callback::{CallbackDispatcher, CallbackRegistry};
    use crate::domain::{ExportJob, ExportState};
    use crate::port::blob_store::mocks::InMemoryBlobStore;
    use crate::port::export_job_repository::mocks::InMemoryExportJobRepository;
    use crate::port::projector::mocks::EchoProjector;
    use crate::port::record_store::mocks::InMemoryRecordStore;
    use crate::port::template_store::mocks::InMemoryTemplateStore;
    use crate::port::time_provider::mocks::SteppingClock;
    use crate::port::ExportJobRepository;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Fixed list of tasks, then closed
    struct ScriptedSource {
        tasks: Mutex<VecDeque<ExportTask>>,
    }

    #[async_trait]
    impl TaskSource for ScriptedSource {
        async fn next_task(&self) -> Option<ExportTask> {
            self.tasks.lock().unwrap().pop_front()
        }
    }

    /// Never yields a task
    struct IdleSource;

    #[async_trait]
    impl TaskSource for IdleSource {
        async fn next_task(&self) -> Option<ExportTask> {
            futures::future::pending().await
        }
    }

    fn executor(repo: Arc<InMemoryExportJobRepository>) -> Arc<BatchExecutor> {
        let records = Arc::new(InMemoryRecordStore::new());
        records.seed("res.partner", &[1, 2], "Partner");
        Arc::new(BatchExecutor::new(
            repo,
            records,
            Arc::new(InMemoryTemplateStore::new()),
            Arc::new(EchoProjector::new()),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(CallbackDispatcher::new(Arc::new(CallbackRegistry::new()))),
            Arc::new(SteppingClock::new(10_000, 1)),
        ))
    }

    #[tokio::test]
    async fn test_worker_drains_source_then_stops() {
        let repo = Arc::new(InMemoryExportJobRepository::new());
        let mut job = ExportJob::new("job-1", 0, "Partners", "res.partner", vec![1, 2]);
        job.parser = Some(serde_json::json!(["name"]));
        job.start(5_000).unwrap();
        repo.insert(&job).await.unwrap();

        let source = Arc::new(ScriptedSource {
            tasks: Mutex::new(VecDeque::from(vec![
                ExportTask::for_job(&job),
                // Re-delivery of a finished job is skipped
                ExportTask::for_job(&job),
                ExportTask {
                    job_id: "unknown".to_string(),
                    channel: "root.jsonify".to_string(),
                    description: "JSON Export: gone".to_string(),
                },
            ])),
        });

        let worker = Worker::new("worker-0", source, executor(repo.clone()));
        let (_tx, token) = shutdown_channel();
        worker.run(token).await;

        let stored = repo.get("job-1").unwrap();
        assert_eq!(stored.state, ExportState::Done);
        assert_eq!(stored.result_count, Some(2));
    }

    /// Blows up inside projection
    struct PanickingProjector;

    impl crate::port::Projector for PanickingProjector {
        fn apply(
            &self,
            _records: &[crate::domain::Record],
            _parser: &serde_json::Value,
            _with_field_names: bool,
        ) -> Result<Vec<serde_json::Value>, crate::port::ProjectionError> {
            panic!("projector exploded");
        }
    }

    #[tokio::test]
    async fn test_panicking_export_marks_job_failed() {
        let repo = Arc::new(InMemoryExportJobRepository::new());
        let records = Arc::new(InMemoryRecordStore::new());
        records.seed("res.partner", &[1], "Partner");
        let executor = Arc::new(BatchExecutor::new(
            repo.clone(),
            records,
            Arc::new(InMemoryTemplateStore::new()),
            Arc::new(PanickingProjector),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(CallbackDispatcher::new(Arc::new(CallbackRegistry::new()))),
            Arc::new(SteppingClock::new(10_000, 1)),
        ));

        let mut job = ExportJob::new("job-p", 0, "Partners", "res.partner", vec![1]);
        job.parser = Some(serde_json::json!(["name"]));
        job.start(5_000).unwrap();
        repo.insert(&job).await.unwrap();

        let source = Arc::new(ScriptedSource {
            tasks: Mutex::new(VecDeque::new()),
        });
        let worker = Worker::new("worker-0", source, executor);
        worker.process(ExportTask::for_job(&job)).await;

        let stored = repo.get("job-p").unwrap();
        assert_eq!(stored.state, ExportState::Failed);
        assert_eq!(
            stored.error_message.as_deref(),
            Some("Export task panicked: projector exploded")
        );
        assert!(stored.completed_at.unwrap() >= stored.started_at.unwrap());
        assert!(stored.result_artifact_id.is_none());
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown_while_idle() {
        let repo = Arc::new(InMemoryExportJobRepository::new());
        let worker = Worker::new("worker-0", Arc::new(IdleSource), executor(repo));
        let (tx, token) = shutdown_channel();

        let running = tokio::spawn(async move { worker.run(token).await });
        tx.shutdown();

        tokio::time::timeout(std::time::Duration::from_secs(1), running)
            .await
            .expect("worker did not stop")
            .unwrap();
    }
}
