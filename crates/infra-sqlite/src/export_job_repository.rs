// SQLite ExportJobRepository Implementation

use crate::error::{corrupt_column, map_sqlx_error};
use async_trait::async_trait;
use jsonify_core::domain::{CallbackTarget, ExportJob, ExportState, JobId, RecordId};
use jsonify_core::error::{AppError, Result};
use jsonify_core::port::ExportJobRepository;
use sqlx::SqlitePool;

pub struct SqliteExportJobRepository {
    pool: SqlitePool,
}

impl SqliteExportJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn encode_record_ids(ids: &[RecordId]) -> Result<String> {
    Ok(serde_json::to_string(ids)?)
}

fn encode_parser(parser: Option<&serde_json::Value>) -> Option<String> {
    parser.map(|p| p.to_string())
}

#[async_trait]
impl ExportJobRepository for SqliteExportJobRepository {
    async fn insert(&self, job: &ExportJob) -> Result<()> {
        let record_ids = encode_record_ids(&job.record_ids)?;

        sqlx::query(
            r#"
            INSERT INTO export_jobs (
                id, name, state, model_name, record_ids,
                export_template_id, parser, batch_size, with_field_names,
                result_artifact_id, result_count, error_message,
                created_at, started_at, completed_at, execution_handle,
                callback_method, callback_record_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.name)
        .bind(job.state.to_string())
        .bind(&job.model_name)
        .bind(record_ids)
        .bind(job.export_template_id)
        .bind(encode_parser(job.parser.as_ref()))
        .bind(job.batch_size)
        .bind(job.with_field_names)
        .bind(job.result_artifact_id)
        .bind(job.result_count.map(|c| c as i64))
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(&job.execution_handle)
        .bind(job.callback.as_ref().map(CallbackTarget::method_path))
        .bind(job.callback.as_ref().and_then(|c| c.record_id))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<ExportJob>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM export_jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn update(&self, job: &ExportJob) -> Result<()> {
        let record_ids = encode_record_ids(&job.record_ids)?;

        // execution_handle is deliberately absent: it has its own writer
        let result = sqlx::query(
            r#"
            UPDATE export_jobs
            SET name = ?, state = ?, model_name = ?, record_ids = ?,
                export_template_id = ?, parser = ?, batch_size = ?, with_field_names = ?,
                result_artifact_id = ?, result_count = ?, error_message = ?,
                started_at = ?, completed_at = ?,
                callback_method = ?, callback_record_id = ?
            WHERE id = ?
            "#,
        )
        .bind(&job.name)
        .bind(job.state.to_string())
        .bind(&job.model_name)
        .bind(record_ids)
        .bind(job.export_template_id)
        .bind(encode_parser(job.parser.as_ref()))
        .bind(job.batch_size)
        .bind(job.with_field_names)
        .bind(job.result_artifact_id)
        .bind(job.result_count.map(|c| c as i64))
        .bind(&job.error_message)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.callback.as_ref().map(CallbackTarget::method_path))
        .bind(job.callback.as_ref().and_then(|c| c.record_id))
        .bind(&job.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Job {} not found", job.id)));
        }
        Ok(())
    }

    async fn set_execution_handle(&self, id: &JobId, handle: Option<&str>) -> Result<()> {
        let result = sqlx::query("UPDATE export_jobs SET execution_handle = ? WHERE id = ?")
            .bind(handle)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Job {} not found", id)));
        }
        Ok(())
    }

    async fn find_by_state(&self, state: ExportState) -> Result<Vec<ExportJob>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            "SELECT * FROM export_jobs WHERE state = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(state.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ExportJob>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            "SELECT * FROM export_jobs ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn count_by_state(&self, state: ExportState) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM export_jobs WHERE state = ?")
            .bind(state.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    name: String,
    state: String,
    model_name: String,
    record_ids: String, // JSON array
    export_template_id: Option<i64>,
    parser: Option<String>, // JSON
    batch_size: i64,
    with_field_names: i64, // SQLite boolean as integer
    result_artifact_id: Option<i64>,
    result_count: Option<i64>,
    error_message: Option<String>,
    created_at: i64,
    started_at: Option<i64>,
    completed_at: Option<i64>,
    execution_handle: Option<String>,
    callback_method: Option<String>,
    callback_record_id: Option<i64>,
}

impl JobRow {
    fn into_job(self) -> Result<ExportJob> {
        let state: ExportState = self.state.parse()?;

        let record_ids: Vec<RecordId> =
            serde_json::from_str(&self.record_ids).map_err(|e| corrupt_column("record_ids", e))?;

        let parser: Option<serde_json::Value> = self
            .parser
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| corrupt_column("parser", e))?;

        let callback = self
            .callback_method
            .as_deref()
            .map(|spec| CallbackTarget::parse(spec, self.callback_record_id))
            .transpose()?;

        Ok(ExportJob {
            id: self.id,
            name: self.name,
            state,
            model_name: self.model_name,
            record_ids,
            export_template_id: self.export_template_id,
            parser,
            batch_size: self.batch_size,
            with_field_names: self.with_field_names != 0,
            result_artifact_id: self.result_artifact_id,
            result_count: self.result_count.map(|c| c.max(0) as u64),
            error_message: self.error_message,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            execution_handle: self.execution_handle,
            callback,
        })
    }
}
