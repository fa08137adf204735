// Execution Engine Port
// Abstraction over the out-of-band task runner that executes export jobs

use crate::domain::{ExportJob, JobId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Queue channel export tasks are submitted to
pub const EXPORT_CHANNEL: &str = "root.jsonify";

/// Unit of work handed to the engine: execute one export job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTask {
    pub job_id: JobId,
    pub channel: String,
    pub description: String,
}

impl ExportTask {
    pub fn for_job(job: &ExportJob) -> Self {
        Self {
            job_id: job.id.clone(),
            channel: EXPORT_CHANNEL.to_string(),
            description: format!("JSON Export: {}", job.name),
        }
    }
}

/// Engine tracking token; engines without correlation ids return `None`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineHandle {
    pub uuid: Option<String>,
}

/// Engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Execution engine not available")]
    Unavailable,

    #[error("Execution engine closed")]
    Closed,

    #[error("Enqueue rejected: {0}")]
    Rejected(String),
}

/// Execution Engine trait
///
/// Implementations:
/// - InProcessEngine: tokio channel drained by in-process workers
/// - UnavailableEngine: stand-in when async execution is disabled
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Whether background execution is possible at all
    fn is_async_capable(&self) -> bool;

    /// Schedule a task for eventual out-of-band execution
    async fn enqueue(&self, task: ExportTask) -> Result<EngineHandle, EngineError>;
}

/// Consumer side of an engine, drained by workers
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Next task, or `None` once the engine is closed and drained
    async fn next_task(&self) -> Option<ExportTask>;
}

/// Stand-in used when no background engine is configured
pub struct UnavailableEngine;

#[async_trait]
impl ExecutionEngine for UnavailableEngine {
    fn is_async_capable(&self) -> bool {
        false
    }

    async fn enqueue(&self, _task: ExportTask) -> Result<EngineHandle, EngineError> {
        Err(EngineError::Unavailable)
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Records enqueued tasks without running them
    pub struct RecordingEngine {
        tasks: Mutex<Vec<ExportTask>>,
        reject_with: Mutex<Option<String>>,
    }

    impl RecordingEngine {
        pub fn new() -> Self {
            Self {
                tasks: Mutex::new(Vec::new()),
                reject_with: Mutex::new(None),
            }
        }

        /// Reject every enqueue with the given reason
        pub fn reject_with(&self, reason: impl Into<String>) {
            *self.reject_with.lock().unwrap() = Some(reason.into());
        }

        pub fn tasks(&self) -> Vec<ExportTask> {
            self.tasks.lock().unwrap().clone()
        }
    }

    impl Default for RecordingEngine {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ExecutionEngine for RecordingEngine {
        fn is_async_capable(&self) -> bool {
            true
        }

        async fn enqueue(&self, task: ExportTask) -> Result<EngineHandle, EngineError> {
            if let Some(reason) = self.reject_with.lock().unwrap().clone() {
                return Err(EngineError::Rejected(reason));
            }
            let mut tasks = self.tasks.lock().unwrap();
            tasks.push(task);
            Ok(EngineHandle {
                uuid: Some(format!("handle-{}", tasks.len())),
            })
        }
    }
}
