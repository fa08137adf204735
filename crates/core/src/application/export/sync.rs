// Synchronous export - same pipeline, result returned to the caller instead of stored

use super::batch::{effective_batch_size, project_in_batches};
use super::parser::resolve_parser;
use crate::domain::{RecordId, TemplateId, DEFAULT_BATCH_SIZE};
use crate::error::Result;
use crate::port::{Projector, RecordStore, TemplateStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Inline export request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncExportRequest {
    pub model_name: String,
    pub record_ids: Vec<RecordId>,
    #[serde(default)]
    pub export_template_id: Option<TemplateId>,
    #[serde(default)]
    pub parser: Option<serde_json::Value>,
    #[serde(default)]
    pub with_field_names: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
}

fn default_batch_size() -> i64 {
    DEFAULT_BATCH_SIZE as i64
}

pub struct SyncExporter {
    record_store: Arc<dyn RecordStore>,
    template_store: Arc<dyn TemplateStore>,
    projector: Arc<dyn Projector>,
}

impl SyncExporter {
    pub fn new(
        record_store: Arc<dyn RecordStore>,
        template_store: Arc<dyn TemplateStore>,
        projector: Arc<dyn Projector>,
    ) -> Self {
        Self {
            record_store,
            template_store,
            projector,
        }
    }

    /// Project records in the caller's task
    ///
    /// Unlike background jobs, an empty (or fully missing) record set is not an
    /// error here: the result is simply empty. No job row and no artifact are written.
    pub async fn export(&self, request: &SyncExportRequest) -> Result<Vec<serde_json::Value>> {
        let ids = self
            .record_store
            .filter_existing(&request.model_name, &request.record_ids)
            .await?;
        if ids.is_empty() {
            debug!(model = %request.model_name, "Sync export with no records");
            return Ok(Vec::new());
        }

        let parser = resolve_parser(
            self.template_store.as_ref(),
            request.export_template_id,
            request.parser.as_ref(),
        )
        .await?;

        let rows = project_in_batches(
            self.record_store.as_ref(),
            self.projector.as_ref(),
            &request.model_name,
            &ids,
            &parser,
            request.with_field_names,
            effective_batch_size(request.batch_size),
            |_, _| {},
        )
        .await?;

        debug!(model = %request.model_name, count = rows.len(), "Sync export finished");
        Ok(rows)
    }
}
