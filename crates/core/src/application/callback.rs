// Callback Dispatcher
// Completion hooks are registered up front under (collection, method) and looked up by name.

use crate::domain::{ExportJob, RecordId};
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Error type returned by callback handlers
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Completion hook
#[async_trait]
pub trait CallbackHandler: Send + Sync {
    /// Called once with the completed job; the return value is only logged
    async fn on_export_done(
        &self,
        record_id: Option<RecordId>,
        job: &ExportJob,
    ) -> Result<(), CallbackError>;
}

/// Adapter so plain closures can be registered
struct FnHandler<F>(F);

#[async_trait]
impl<F> CallbackHandler for FnHandler<F>
where
    F: Fn(Option<RecordId>, &ExportJob) -> Result<(), CallbackError> + Send + Sync,
{
    async fn on_export_done(
        &self,
        record_id: Option<RecordId>,
        job: &ExportJob,
    ) -> Result<(), CallbackError> {
        (self.0)(record_id, job)
    }
}

/// Handlers keyed by `(collection, method)`, filled at startup
#[derive(Default)]
pub struct CallbackRegistry {
    handlers: HashMap<(String, String), Arc<dyn CallbackHandler>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a handler
    pub fn register(
        &mut self,
        collection: impl Into<String>,
        method: impl Into<String>,
        handler: Arc<dyn CallbackHandler>,
    ) {
        let key = (collection.into(), method.into());
        debug!(collection = %key.0, method = %key.1, "Registered export callback");
        self.handlers.insert(key, handler);
    }

    /// Register a synchronous closure
    pub fn register_fn<F>(
        &mut self,
        collection: impl Into<String>,
        method: impl Into<String>,
        handler: F,
    ) where
        F: Fn(Option<RecordId>, &ExportJob) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.register(collection, method, Arc::new(FnHandler(handler)));
    }

    pub fn resolve(&self, collection: &str, method: &str) -> Option<Arc<dyn CallbackHandler>> {
        self.handlers
            .get(&(collection.to_string(), method.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Invokes a job's callback target, never letting a failure escape
pub struct CallbackDispatcher {
    registry: Arc<CallbackRegistry>,
}

impl CallbackDispatcher {
    pub fn new(registry: Arc<CallbackRegistry>) -> Self {
        Self { registry }
    }

    /// Dispatch the job's callback, if any
    ///
    /// Unknown targets, handler errors and handler panics are logged as warnings.
    /// The job's own outcome is never affected.
    pub async fn dispatch(&self, job: &ExportJob) {
        let Some(target) = &job.callback else {
            return;
        };

        let Some(handler) = self.registry.resolve(&target.collection, &target.method) else {
            warn!(
                job_id = %job.id,
                callback = %target.method_path(),
                "Callback failed: no handler registered"
            );
            return;
        };

        let call = handler.on_export_done(target.record_id, job);
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(())) => {
                info!(job_id = %job.id, callback = %target.method_path(), "Callback executed");
            }
            Ok(Err(e)) => {
                warn!(
                    job_id = %job.id,
                    callback = %target.method_path(),
                    error = %e,
                    "Callback failed"
                );
            }
            Err(_) => {
                warn!(
                    job_id = %job.id,
                    callback = %target.method_path(),
                    "Callback panicked"
                );
            }
        }
    }
}
