//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results.

use jsonify_core::application::{CreateExportRequest, StartReceipt};
use jsonify_core::domain::{ArtifactId, ExportJob, RecordId, TemplateId};
use serde::{Deserialize, Serialize};

/// Job as returned over the wire (record ids and parser omitted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: String,
    pub name: String,
    pub state: String,
    pub model_name: String,
    pub record_count: usize,
    pub export_template_id: Option<TemplateId>,
    pub batch_size: i64,
    pub with_field_names: bool,
    pub result_artifact_id: Option<ArtifactId>,
    pub result_count: Option<u64>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub execution_handle: Option<String>,
    pub callback: Option<String>,
}

impl From<&ExportJob> for JobView {
    fn from(job: &ExportJob) -> Self {
        Self {
            job_id: job.id.clone(),
            name: job.name.clone(),
            state: job.state.to_string(),
            model_name: job.model_name.clone(),
            record_count: job.record_ids.len(),
            export_template_id: job.export_template_id,
            batch_size: job.batch_size,
            with_field_names: job.with_field_names,
            result_artifact_id: job.result_artifact_id,
            result_count: job.result_count,
            error_message: job.error_message.clone(),
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            execution_handle: job.execution_handle.clone(),
            callback: job.callback.as_ref().map(|c| c.method_path()),
        }
    }
}

/// export.create.v1
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    #[serde(flatten)]
    pub export: CreateExportRequest,
    /// Start the job right after creating it
    #[serde(default)]
    pub start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResponse {
    pub job: JobView,
    pub receipt: Option<StartReceipt>,
}

/// export.start.v1, export.retry.v1, export.cancel.v1, export.get.v1, export.result.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct JobIdRequest {
    pub job_id: String,
}

/// export.list.v1 (params optional)
#[derive(Debug, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub jobs: Vec<JobView>,
}

/// export.download.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub artifact_id: ArtifactId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub artifact_id: ArtifactId,
    pub name: String,
    pub content_type: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub count: usize,
    pub records: Vec<serde_json::Value>,
}

/// template.create.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct TemplateCreateRequest {
    pub name: String,
    pub model_name: String,
    pub parser: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateCreateResponse {
    pub template_id: TemplateId,
}

/// records.import.v1 - each record is a JSON object carrying an integer `id`
#[derive(Debug, Serialize, Deserialize)]
pub struct ImportRecordsRequest {
    pub model_name: String,
    pub records: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecordsResponse {
    pub imported: usize,
    pub ids: Vec<RecordId>,
}

/// admin.stats.v1 (no parameters)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_jobs: i64,
    pub pending_jobs: i64,
    pub processing_jobs: i64,
    pub done_jobs: i64,
    pub failed_jobs: i64,
    pub async_enabled: bool,
    pub uptime_seconds: i64,
}
