//! RPC Method Handlers
//!
//! Thin adapters from JSON-RPC params to the core use cases.

use crate::error::{to_rpc_error, to_rpc_error_with};
use crate::types::{
    CreateRequest, CreateResponse, DownloadRequest, DownloadResponse, ImportRecordsRequest,
    ImportRecordsResponse, JobIdRequest, JobView, ListRequest, ListResponse, StatsResponse,
    SyncResponse, TemplateCreateRequest, TemplateCreateResponse,
};
use jsonify_core::application::{JobController, StartReceipt, SyncExportRequest, SyncExporter};
use jsonify_core::domain::{ExportState, Record, ResultLocator};
use jsonify_core::error::AppError;
use jsonify_core::port::{RecordWriter, TemplateStore};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tracing::info;

/// Upper bound for `export.list.v1`
const MAX_LIST_LIMIT: usize = 1000;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    controller: Arc<JobController>,
    sync_exporter: Arc<SyncExporter>,
    templates: Arc<dyn TemplateStore>,
    record_writer: Arc<dyn RecordWriter>,
    start_time: std::time::Instant,
}

impl RpcHandler {
    pub fn new(
        controller: Arc<JobController>,
        sync_exporter: Arc<SyncExporter>,
        templates: Arc<dyn TemplateStore>,
        record_writer: Arc<dyn RecordWriter>,
    ) -> Self {
        Self {
            controller,
            sync_exporter,
            templates,
            record_writer,
            start_time: std::time::Instant::now(),
        }
    }

    /// export.create.v1
    ///
    /// When `start` is set and starting fails, the job still exists as Pending;
    /// the error carries `{"job_id": ...}` so the caller can retry the start.
    pub async fn create(&self, params: CreateRequest) -> Result<CreateResponse, ErrorObjectOwned> {
        let job = self
            .controller
            .create(params.export)
            .await
            .map_err(to_rpc_error)?;

        if !params.start {
            return Ok(CreateResponse {
                job: JobView::from(&job),
                receipt: None,
            });
        }

        let receipt = self
            .controller
            .start(&job.id)
            .await
            .map_err(|e| to_rpc_error_with(e, serde_json::json!({ "job_id": job.id })))?;
        let job = self.controller.get(&job.id).await.map_err(to_rpc_error)?;

        Ok(CreateResponse {
            job: JobView::from(&job),
            receipt: Some(receipt),
        })
    }

    /// export.start.v1
    pub async fn start(&self, params: JobIdRequest) -> Result<StartReceipt, ErrorObjectOwned> {
        self.controller
            .start(&params.job_id)
            .await
            .map_err(to_rpc_error)
    }

    /// export.retry.v1
    pub async fn retry(&self, params: JobIdRequest) -> Result<StartReceipt, ErrorObjectOwned> {
        self.controller
            .retry(&params.job_id)
            .await
            .map_err(to_rpc_error)
    }

    /// export.cancel.v1
    pub async fn cancel(&self, params: JobIdRequest) -> Result<JobView, ErrorObjectOwned> {
        let job = self
            .controller
            .cancel(&params.job_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(JobView::from(&job))
    }

    /// export.get.v1
    pub async fn get(&self, params: JobIdRequest) -> Result<JobView, ErrorObjectOwned> {
        let job = self
            .controller
            .get(&params.job_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(JobView::from(&job))
    }

    /// export.list.v1
    pub async fn list(&self, params: ListRequest) -> Result<ListResponse, ErrorObjectOwned> {
        let jobs = self
            .controller
            .list(params.limit.min(MAX_LIST_LIMIT))
            .await
            .map_err(to_rpc_error)?;
        Ok(ListResponse {
            jobs: jobs.iter().map(JobView::from).collect(),
        })
    }

    /// export.result.v1
    pub async fn result(&self, params: JobIdRequest) -> Result<ResultLocator, ErrorObjectOwned> {
        self.controller
            .fetch_result(&params.job_id)
            .await
            .map_err(to_rpc_error)
    }

    /// export.download.v1
    pub async fn download(
        &self,
        params: DownloadRequest,
    ) -> Result<DownloadResponse, ErrorObjectOwned> {
        let artifact = self
            .controller
            .download(params.artifact_id)
            .await
            .map_err(to_rpc_error)?;

        let content = String::from_utf8(artifact.content).map_err(|e| {
            to_rpc_error(AppError::Internal(format!(
                "Artifact {} is not UTF-8: {}",
                artifact.id, e
            )))
        })?;

        Ok(DownloadResponse {
            artifact_id: artifact.id,
            name: artifact.name,
            content_type: artifact.content_type,
            content,
        })
    }

    /// export.sync.v1
    pub async fn sync(&self, params: SyncExportRequest) -> Result<SyncResponse, ErrorObjectOwned> {
        let records = self
            .sync_exporter
            .export(&params)
            .await
            .map_err(to_rpc_error)?;
        Ok(SyncResponse {
            count: records.len(),
            records,
        })
    }

    /// template.create.v1
    pub async fn create_template(
        &self,
        params: TemplateCreateRequest,
    ) -> Result<TemplateCreateResponse, ErrorObjectOwned> {
        if params.name.trim().is_empty() || params.model_name.trim().is_empty() {
            return Err(to_rpc_error(AppError::Validation(
                "name and model_name are required".to_string(),
            )));
        }
        if !(params.parser.is_array() || params.parser.is_object()) {
            return Err(to_rpc_error(AppError::Validation(
                "parser must be a JSON array or object".to_string(),
            )));
        }

        let template_id = self
            .templates
            .insert(&params.name, &params.model_name, &params.parser)
            .await
            .map_err(to_rpc_error)?;

        info!(template_id = template_id, model = %params.model_name, "Export template created");
        Ok(TemplateCreateResponse { template_id })
    }

    /// records.import.v1
    pub async fn import_records(
        &self,
        params: ImportRecordsRequest,
    ) -> Result<ImportRecordsResponse, ErrorObjectOwned> {
        let records = params
            .records
            .into_iter()
            .enumerate()
            .map(|(index, value)| to_record(index, value))
            .collect::<Result<Vec<_>, _>>()
            .map_err(to_rpc_error)?;

        let imported = self
            .record_writer
            .upsert(&params.model_name, &records)
            .await
            .map_err(to_rpc_error)?;

        Ok(ImportRecordsResponse {
            imported,
            ids: records.iter().map(|r| r.id).collect(),
        })
    }

    /// admin.stats.v1
    pub async fn stats(&self) -> Result<StatsResponse, ErrorObjectOwned> {
        let counts = self
            .controller
            .state_counts()
            .await
            .map_err(to_rpc_error)?;
        let count_of = |state: ExportState| {
            counts
                .iter()
                .find(|(s, _)| *s == state)
                .map(|(_, n)| *n)
                .unwrap_or(0)
        };

        Ok(StatsResponse {
            total_jobs: counts.iter().map(|(_, n)| n).sum(),
            pending_jobs: count_of(ExportState::Pending),
            processing_jobs: count_of(ExportState::Processing),
            done_jobs: count_of(ExportState::Done),
            failed_jobs: count_of(ExportState::Failed),
            async_enabled: self.controller.is_async_capable(),
            uptime_seconds: self.start_time.elapsed().as_secs() as i64,
        })
    }
}

fn to_record(index: usize, value: serde_json::Value) -> Result<Record, AppError> {
    let serde_json::Value::Object(fields) = value else {
        return Err(AppError::Validation(format!(
            "record #{} is not a JSON object",
            index
        )));
    };
    let id = fields
        .get("id")
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| AppError::Validation(format!("record #{} needs an integer 'id'", index)))?;
    Ok(Record::new(id, fields))
}
