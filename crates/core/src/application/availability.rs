// Availability Guard
// Async operations need a background execution engine; everything else keeps working without one.

use crate::error::{AppError, Result};
use crate::port::ExecutionEngine;

/// Remediation shown when async exports are requested without an engine
pub const ENGINE_REMEDIATION_HINT: &str = "A background execution engine is required for async exports. \
     Enable it with `async_enabled = true` (env JSONIFY_ASYNC_ENABLED=true) and restart the daemon, \
     or use the synchronous export instead.";

/// Fail with `CapabilityUnavailable` when the engine cannot run background work
///
/// Must be called before any state mutation so a rejected request leaves the job untouched.
pub fn ensure_async_capable(engine: &dyn ExecutionEngine) -> Result<()> {
    if engine.is_async_capable() {
        Ok(())
    } else {
        Err(AppError::CapabilityUnavailable(
            ENGINE_REMEDIATION_HINT.to_string(),
        ))
    }
}
