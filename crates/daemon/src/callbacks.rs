//! Completion hooks available out of the box

use jsonify_core::application::CallbackRegistry;
use jsonify_core::domain::JOB_COLLECTION;
use tracing::info;

pub const LOG_COMPLETION: &str = "log_completion";

/// Registry with the built-in hooks
///
/// `jsonify.job/log_completion` writes one info line per finished export.
pub fn builtin_registry() -> CallbackRegistry {
    let mut registry = CallbackRegistry::new();
    registry.register_fn(JOB_COLLECTION, LOG_COMPLETION, |record_id, job| {
        info!(
            job_id = %job.id,
            model = %job.model_name,
            record_id = ?record_id,
            result_count = ?job.result_count,
            "Export completed"
        );
        Ok(())
    });
    registry
}
