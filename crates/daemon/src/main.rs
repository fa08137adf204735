//! JSONify Daemon - Main Entry Point
//! JSON-RPC server + in-process export workers over one SQLite database

mod callbacks;
mod config;
mod logging;
mod telemetry;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use config::DaemonConfig;
use jsonify_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use jsonify_core::application::worker::constants::SHUTDOWN_GRACE_PERIOD;
use jsonify_core::application::{
    shutdown_channel, BatchExecutor, CallbackDispatcher, JobController, RecoveryService,
    SyncExporter, Worker,
};
use jsonify_core::port::id_provider::UuidProvider;
use jsonify_core::port::time_provider::SystemTimeProvider;
use jsonify_core::port::{ExecutionEngine, UnavailableEngine};
use jsonify_infra_sqlite::{
    create_pool, run_migrations, SqliteBlobStore, SqliteExportJobRepository, SqliteRecordStore,
    SqliteTemplateStore,
};
use jsonify_infra_system::{FieldProjector, InProcessEngine};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration, then logging
    let cfg = DaemonConfig::load()?;
    let _log_guard = logging::init(&cfg)?;
    telemetry::report_status();

    info!("JSONify daemon v{} starting...", VERSION);
    info!(
        db_path = %cfg.db_path,
        workers = cfg.workers,
        async_enabled = cfg.async_enabled,
        "Configuration loaded"
    );

    // 2. Database
    if !cfg.is_in_memory() {
        if let Some(parent) = Path::new(&cfg.db_path).parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
    }
    let pool = create_pool(&cfg.db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 3. Adapters (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let job_repo = Arc::new(SqliteExportJobRepository::new(pool.clone()));
    let record_store = Arc::new(SqliteRecordStore::new(pool.clone(), time_provider.clone()));
    let template_store = Arc::new(SqliteTemplateStore::new(pool.clone(), time_provider.clone()));
    let blob_store = Arc::new(SqliteBlobStore::new(
        pool.clone(),
        time_provider.clone(),
        cfg.artifact_url_base.clone(),
    ));
    let projector = Arc::new(FieldProjector::new());

    let in_process = cfg.async_enabled.then(|| Arc::new(InProcessEngine::new()));
    let engine: Arc<dyn ExecutionEngine> = match &in_process {
        Some(engine) => engine.clone(),
        None => {
            warn!("Async execution disabled; background exports will be rejected");
            Arc::new(UnavailableEngine)
        }
    };

    // 4. Use cases
    let dispatcher = Arc::new(CallbackDispatcher::new(Arc::new(
        callbacks::builtin_registry(),
    )));
    let executor = Arc::new(BatchExecutor::new(
        job_repo.clone(),
        record_store.clone(),
        template_store.clone(),
        projector.clone(),
        blob_store.clone(),
        dispatcher,
        time_provider.clone(),
    ));
    let controller = Arc::new(JobController::new(
        job_repo.clone(),
        engine.clone(),
        blob_store,
        id_provider,
        time_provider,
    ));
    let sync_exporter = Arc::new(SyncExporter::new(
        record_store.clone(),
        template_store.clone(),
        projector,
    ));

    // 5. Jobs left PROCESSING by a previous run
    info!("Running crash recovery...");
    match RecoveryService::new(job_repo, engine)
        .requeue_orphaned()
        .await
    {
        Ok(count) => info!(requeued_jobs = count, "Crash recovery completed"),
        Err(e) => error!(error = ?e, "Crash recovery failed"),
    }

    // 6. Workers
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let mut worker_handles = Vec::new();
    if let Some(engine) = &in_process {
        info!(count = cfg.workers, "Starting workers...");
        for n in 0..cfg.workers {
            let worker = Worker::new(format!("worker-{}", n), engine.clone(), executor.clone());
            let token = shutdown_rx.clone();
            worker_handles.push(tokio::spawn(async move { worker.run(token).await }));
        }
    }

    // 7. JSON-RPC server
    info!("Starting JSON-RPC server...");
    let handler = Arc::new(RpcHandler::new(
        controller,
        sync_exporter,
        template_store,
        record_store,
    ));
    let rpc_config = RpcServerConfig {
        host: cfg.rpc_host.clone(),
        port: cfg.rpc_port,
    };
    let (rpc_handle, rpc_addr) = RpcServer::new(rpc_config, handler)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(addr = %rpc_addr, "System ready. Waiting for exports...");
    info!("Press Ctrl+C to shutdown");

    // 8. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 9. Graceful shutdown: stop intake, then let in-flight exports finish
    if let Err(e) = rpc_handle.stop() {
        warn!(error = %e, "RPC server already stopped");
    }
    if let Some(engine) = &in_process {
        engine.close();
    }
    shutdown_tx.shutdown();

    let drain = join_workers(worker_handles);
    if tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, drain).await.is_err() {
        warn!(
            grace_period_secs = SHUTDOWN_GRACE_PERIOD.as_secs(),
            "Workers still busy after grace period; exiting anyway"
        );
    }

    pool.close().await;
    telemetry::shutdown();
    info!("Shutdown complete.");

    Ok(())
}

async fn join_workers(handles: Vec<tokio::task::JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Worker task failed");
        }
    }
}
