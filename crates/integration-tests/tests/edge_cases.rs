//! Edge cases: missing engine, cancellation races, concurrency, re-delivery

mod common;

use common::{Harness, MODEL};
use jsonify_core::application::{CreateExportRequest, ExecutionOutcome, RecoveryService, SyncExportRequest};
use jsonify_core::domain::{DomainError, ExportState, CANCELLED_MESSAGE};
use jsonify_core::error::AppError;
use jsonify_core::port::ExportJobRepository;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;

fn request(ids: Vec<i64>) -> CreateExportRequest {
    let mut req = CreateExportRequest::new(MODEL, ids);
    req.parser = Some(json!(["id", "name"]));
    req
}

#[tokio::test]
async fn test_start_without_engine_leaves_job_pending() {
    let h = Harness::without_engine().await;
    h.seed([1]).await;
    assert!(!h.controller.is_async_capable());

    let job = h.controller.create(request(vec![1])).await.unwrap();
    let err = h.controller.start(&job.id).await.unwrap_err();
    assert!(matches!(err, AppError::CapabilityUnavailable(_)), "{err:?}");

    let job = h.controller.get(&job.id).await.unwrap();
    assert_eq!(job.state, ExportState::Pending);
    assert!(job.started_at.is_none());
    assert!(job.execution_handle.is_none());

    let requeued = RecoveryService::new(h.jobs.clone(), h.engine_port.clone())
        .requeue_orphaned()
        .await
        .unwrap();
    assert_eq!(requeued, 0);
}

#[tokio::test]
async fn test_cancel_before_pickup_is_not_overwritten() {
    let h = Harness::in_memory().await;
    h.seed([1, 2]).await;

    let job = h.controller.create(request(vec![1, 2])).await.unwrap();
    h.controller.start(&job.id).await.unwrap();
    let cancelled = h.controller.cancel(&job.id).await.unwrap();
    assert_eq!(cancelled.state, ExportState::Failed);

    // Drain the queued task, then let workers exit
    let (_shutdown, workers) = h.spawn_workers(1);
    h.engine.as_ref().unwrap().close();
    for worker in workers {
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .unwrap()
            .unwrap();
    }

    let job = h.controller.get(&job.id).await.unwrap();
    assert_eq!(job.state, ExportState::Failed);
    assert_eq!(job.error_message.as_deref(), Some(CANCELLED_MESSAGE));
    assert!(job.result_artifact_id.is_none());
    assert!(h.callback_log().is_empty());
}

#[tokio::test]
async fn test_many_jobs_many_workers() {
    let h = Harness::in_memory().await;
    h.seed(1..=10).await;
    let (shutdown, workers) = h.spawn_workers(4);

    let mut ids = Vec::new();
    for n in 0..20 {
        let mut req = request((1..=10).collect());
        req.batch_size = Some(n % 4 + 1);
        let job = h.controller.create(req).await.unwrap();
        h.controller.start(&job.id).await.unwrap();
        ids.push(job.id);
    }

    let mut artifacts = HashSet::new();
    for id in &ids {
        let done = h.wait_settled(id).await;
        assert_eq!(done.state, ExportState::Done);
        assert_eq!(done.result_count, Some(10));
        artifacts.insert(done.result_artifact_id.unwrap());
    }
    assert_eq!(artifacts.len(), 20, "one artifact per job");
    assert_eq!(h.jobs.count_by_state(ExportState::Done).await.unwrap(), 20);

    shutdown.shutdown();
    for worker in workers {
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .unwrap()
            .unwrap();
    }
}

#[tokio::test]
async fn test_redelivery_after_done_is_skipped() {
    let h = Harness::in_memory().await;
    h.seed([1]).await;
    let (_shutdown, _workers) = h.spawn_workers(1);

    let job = h.controller.create(request(vec![1])).await.unwrap();
    h.controller.start(&job.id).await.unwrap();
    let done = h.wait_settled(&job.id).await;

    let outcome = h.executor.execute(&job.id).await.unwrap();
    assert_eq!(
        outcome,
        ExecutionOutcome::Skipped {
            state: ExportState::Done
        }
    );
    let again = h.controller.get(&job.id).await.unwrap();
    assert_eq!(again.result_artifact_id, done.result_artifact_id);
    assert_eq!(again.completed_at, done.completed_at);
}

#[tokio::test]
async fn test_double_start_is_rejected() {
    let h = Harness::in_memory().await;
    h.seed([1]).await;

    let job = h.controller.create(request(vec![1])).await.unwrap();
    h.controller.start(&job.id).await.unwrap();

    let err = h.controller.start(&job.id).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn test_invalid_request_persists_nothing() {
    let h = Harness::in_memory().await;

    let mut req = request(vec![1]);
    req.export_template_id = Some(1);
    assert!(matches!(
        h.controller.create(req).await,
        Err(AppError::Validation(_))
    ));

    let mut req = request(vec![1]);
    req.callback = Some("no_dot".to_string());
    assert!(h.controller.create(req).await.is_err());

    assert!(h.controller.list(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_export() {
    let h = Harness::in_memory().await;
    h.seed([1, 2, 3]).await;

    let req = SyncExportRequest {
        model_name: MODEL.to_string(),
        record_ids: vec![3, 404, 1],
        export_template_id: None,
        parser: Some(json!(["name:label"])),
        with_field_names: true,
        batch_size: 1,
    };
    let rows = h.sync.export(&req).await.unwrap();
    assert_eq!(
        rows,
        vec![json!({"label": "Partner 3"}), json!({"label": "Partner 1"})]
    );

    let empty = SyncExportRequest {
        record_ids: vec![404],
        ..req
    };
    assert!(h.sync.export(&empty).await.unwrap().is_empty());
    assert!(h.controller.list(10).await.unwrap().is_empty(), "no job rows");
}
