// Export Use Cases - batch pipeline shared by the background executor and the synchronous path

mod artifact;
mod batch;
mod executor;
mod parser;
mod sync;

pub use artifact::{render_json, JSON_CONTENT_TYPE};
pub use batch::{effective_batch_size, project_in_batches};
pub use executor::{BatchExecutor, ExecutionOutcome};
pub use parser::resolve_parser;
pub use sync::{SyncExportRequest, SyncExporter};

use crate::error::AppError;
use crate::port::ProjectionError;
use thiserror::Error;

/// Failures while producing an export
///
/// The `Display` text is what ends up in a failed job's `error_message`.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No valid records found for export.")]
    NoRecords,

    #[error("No parser configuration provided.")]
    NoParser,

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("{0}")]
    Storage(String),

    #[error("Failed to render export: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<AppError> for ExportError {
    fn from(err: AppError) -> Self {
        ExportError::Storage(err.to_string())
    }
}
