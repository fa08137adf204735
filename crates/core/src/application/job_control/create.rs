// Create Use Case

use crate::domain::{CallbackTarget, ExportJob, RecordId, TemplateId, DEFAULT_BATCH_SIZE};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, TimeProvider};
use serde::{Deserialize, Serialize};

/// Maximum length of a job name
pub const MAX_NAME_LEN: usize = 255;

/// Create request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExportRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub model_name: String,
    #[serde(default)]
    pub record_ids: Vec<RecordId>,
    #[serde(default)]
    pub export_template_id: Option<TemplateId>,
    #[serde(default)]
    pub parser: Option<serde_json::Value>,
    #[serde(default)]
    pub batch_size: Option<i64>,
    #[serde(default)]
    pub with_field_names: bool,

    /// Completion hook as `collection.method`
    #[serde(default)]
    pub callback: Option<String>,
    #[serde(default)]
    pub callback_record_id: Option<RecordId>,
}

impl CreateExportRequest {
    pub fn new(model_name: impl Into<String>, record_ids: Vec<RecordId>) -> Self {
        Self {
            name: None,
            model_name: model_name.into(),
            record_ids,
            export_template_id: None,
            parser: None,
            batch_size: None,
            with_field_names: false,
            callback: None,
            callback_record_id: None,
        }
    }
}

/// Reject requests that can never produce a valid job
///
/// An empty `record_ids` list is accepted; the export itself then fails with
/// "No valid records found for export.".
pub fn validate_request(req: &CreateExportRequest) -> Result<()> {
    if req.model_name.trim().is_empty() {
        return Err(AppError::Validation("model_name cannot be empty".to_string()));
    }

    if let Some(name) = &req.name {
        let chars = name.chars().count();
        if chars > MAX_NAME_LEN {
            return Err(AppError::Validation(format!(
                "name too long ({} > {} chars)",
                chars,
                MAX_NAME_LEN
            )));
        }
    }

    if req.export_template_id.is_some() && req.parser.is_some() {
        return Err(AppError::Validation(
            "export_template_id and parser are mutually exclusive".to_string(),
        ));
    }

    if let Some(parser) = &req.parser {
        if !(parser.is_array() || parser.is_object()) {
            return Err(AppError::Validation(
                "parser must be a JSON array or object".to_string(),
            ));
        }
    }

    if req.callback_record_id.is_some() && req.callback.is_none() {
        return Err(AppError::Validation(
            "callback_record_id requires callback".to_string(),
        ));
    }

    if let Some(callback) = &req.callback {
        CallbackTarget::parse(callback, req.callback_record_id)?;
    }

    Ok(())
}

/// Build the pending job for a validated request
pub fn build_job(
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    req: CreateExportRequest,
) -> Result<ExportJob> {
    validate_request(&req)?;

    let created_at = time_provider.now_millis();
    let name = match req.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => ExportJob::default_name(created_at),
    };

    let mut job = ExportJob::new(
        id_provider.generate_id(),
        created_at,
        name,
        req.model_name,
        req.record_ids,
    );
    job.export_template_id = req.export_template_id;
    job.parser = req.parser;
    job.batch_size = req.batch_size.unwrap_or(DEFAULT_BATCH_SIZE as i64);
    job.with_field_names = req.with_field_names;
    job.callback = req
        .callback
        .as_deref()
        .map(|spec| CallbackTarget::parse(spec, req.callback_record_id))
        .transpose()?;

    Ok(job)
}
