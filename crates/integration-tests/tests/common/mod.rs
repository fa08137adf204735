//! Shared wiring: the daemon's object graph over a real SQLite database

#![allow(dead_code)]

use jsonify_core::application::{
    shutdown_channel, BatchExecutor, CallbackDispatcher, CallbackRegistry, JobController,
    ShutdownSender, SyncExporter, Worker,
};
use jsonify_core::domain::{ExportJob, ExportState, JobId, Record, RecordId};
use jsonify_core::port::id_provider::UuidProvider;
use jsonify_core::port::time_provider::SystemTimeProvider;
use jsonify_core::port::{ExecutionEngine, ExportJobRepository, RecordWriter, UnavailableEngine};
use jsonify_infra_sqlite::{
    create_pool, run_migrations, SqliteBlobStore, SqliteExportJobRepository, SqliteRecordStore,
    SqliteTemplateStore,
};
use jsonify_infra_system::{FieldProjector, InProcessEngine};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const MODEL: &str = "res.partner";
pub const CALLBACK: &str = "res.partner.on_export_done";
pub const URL_BASE: &str = "/artifacts";

/// (callback record id, job id) per hook invocation
pub type CallbackLog = Arc<Mutex<Vec<(Option<RecordId>, JobId)>>>;

pub struct Harness {
    pub pool: SqlitePool,
    pub jobs: Arc<SqliteExportJobRepository>,
    pub records: Arc<SqliteRecordStore>,
    pub templates: Arc<SqliteTemplateStore>,
    pub blobs: Arc<SqliteBlobStore>,
    pub engine: Option<Arc<InProcessEngine>>,
    pub engine_port: Arc<dyn ExecutionEngine>,
    pub executor: Arc<BatchExecutor>,
    pub controller: Arc<JobController>,
    pub sync: Arc<SyncExporter>,
    pub callbacks: CallbackLog,
}

impl Harness {
    pub async fn in_memory() -> Self {
        Self::open(":memory:", true).await
    }

    pub async fn without_engine() -> Self {
        Self::open(":memory:", false).await
    }

    pub async fn open(url: &str, async_enabled: bool) -> Self {
        let pool = create_pool(url).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let time = Arc::new(SystemTimeProvider);
        let jobs = Arc::new(SqliteExportJobRepository::new(pool.clone()));
        let records = Arc::new(SqliteRecordStore::new(pool.clone(), time.clone()));
        let templates = Arc::new(SqliteTemplateStore::new(pool.clone(), time.clone()));
        let blobs = Arc::new(SqliteBlobStore::new(pool.clone(), time.clone(), URL_BASE));
        let projector = Arc::new(FieldProjector::new());

        let engine = async_enabled.then(|| Arc::new(InProcessEngine::new()));
        let engine_port: Arc<dyn ExecutionEngine> = match &engine {
            Some(engine) => engine.clone(),
            None => Arc::new(UnavailableEngine),
        };

        let callbacks: CallbackLog = Arc::new(Mutex::new(Vec::new()));
        let log = callbacks.clone();
        let mut registry = CallbackRegistry::new();
        let (collection, method) = CALLBACK.rsplit_once('.').unwrap();
        registry.register_fn(collection, method, move |record_id, job: &ExportJob| {
            log.lock().unwrap().push((record_id, job.id.clone()));
            Ok(())
        });

        let executor = Arc::new(BatchExecutor::new(
            jobs.clone(),
            records.clone(),
            templates.clone(),
            projector.clone(),
            blobs.clone(),
            Arc::new(CallbackDispatcher::new(Arc::new(registry))),
            time.clone(),
        ));
        let controller = Arc::new(JobController::new(
            jobs.clone(),
            engine_port.clone(),
            blobs.clone(),
            Arc::new(UuidProvider),
            time,
        ));
        let sync = Arc::new(SyncExporter::new(
            records.clone(),
            templates.clone(),
            projector,
        ));

        Self {
            pool,
            jobs,
            records,
            templates,
            blobs,
            engine,
            engine_port,
            executor,
            controller,
            sync,
            callbacks,
        }
    }

    /// Insert `ids` as partners named "Partner {id}"
    pub async fn seed(&self, ids: impl IntoIterator<Item = RecordId>) {
        let records: Vec<Record> = ids
            .into_iter()
            .map(|id| {
                let fields = json!({
                    "name": format!("Partner {}", id),
                    "email": format!("p{}@example.com", id),
                });
                Record::new(id, fields.as_object().cloned().unwrap())
            })
            .collect();
        self.records.upsert(MODEL, &records).await.unwrap();
    }

    pub fn spawn_workers(&self, count: usize) -> (ShutdownSender, Vec<JoinHandle<()>>) {
        let engine = self.engine.clone().expect("harness has no engine");
        let (tx, token) = shutdown_channel();
        let handles = (0..count)
            .map(|n| {
                let worker = Worker::new(format!("test-{}", n), engine.clone(), self.executor.clone());
                let token = token.clone();
                tokio::spawn(async move { worker.run(token).await })
            })
            .collect();
        (tx, handles)
    }

    /// Poll until the job leaves Processing (Pending counts as not started)
    pub async fn wait_settled(&self, id: &JobId) -> ExportJob {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            let job = self.jobs.find_by_id(id).await.unwrap().unwrap();
            if matches!(job.state, ExportState::Done | ExportState::Failed) {
                return job;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "job {} still {} after 10s",
                id,
                job.state
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub fn callback_log(&self) -> Vec<(Option<RecordId>, JobId)> {
        self.callbacks.lock().unwrap().clone()
    }
}
