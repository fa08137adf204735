// Batch pipeline

use super::ExportError;
use crate::domain::{RecordId, DEFAULT_BATCH_SIZE};
use crate::port::{Projector, RecordStore};

/// Batch size actually used; non-positive configured values fall back to the default
pub fn effective_batch_size(configured: i64) -> usize {
    match usize::try_from(configured) {
        Ok(size) if size > 0 => size,
        _ => DEFAULT_BATCH_SIZE,
    }
}

/// Load and project `ids` in contiguous batches, preserving input order
///
/// Only one batch of records is held at a time. `on_progress(processed, total)`
/// runs after every batch. Output is the same for every batch size.
#[allow(clippy::too_many_arguments)]
pub async fn project_in_batches<F>(
    records: &dyn RecordStore,
    projector: &dyn Projector,
    model: &str,
    ids: &[RecordId],
    parser: &serde_json::Value,
    with_field_names: bool,
    batch_size: usize,
    mut on_progress: F,
) -> Result<Vec<serde_json::Value>, ExportError>
where
    F: FnMut(usize, usize),
{
    let total = ids.len();
    let mut rows = Vec::with_capacity(total);
    let mut processed = 0;

    for chunk in ids.chunks(batch_size.max(1)) {
        let batch = records.resolve(model, chunk).await?;
        let projected = projector.apply(&batch, parser, with_field_names)?;
        rows.extend(projected);

        processed += chunk.len();
        on_progress(processed, total);
    }

    Ok(rows)
}
