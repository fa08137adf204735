// In-Process Execution Engine
// FIFO tokio channel: the controller enqueues, daemon workers drain it. No retry, no backoff.

use async_trait::async_trait;
use jsonify_core::port::{EngineError, EngineHandle, ExecutionEngine, ExportTask, TaskSource};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub struct InProcessEngine {
    tx: Mutex<Option<mpsc::UnboundedSender<ExportTask>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ExportTask>>,
}

impl InProcessEngine {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Stop accepting tasks; queued tasks are still handed out, then `next_task` yields `None`
    pub fn close(&self) {
        if let Ok(mut tx) = self.tx.lock() {
            if tx.take().is_some() {
                info!("In-process engine closed");
            }
        }
    }

    fn sender(&self) -> Option<mpsc::UnboundedSender<ExportTask>> {
        self.tx.lock().ok().and_then(|tx| tx.clone())
    }
}

impl Default for InProcessEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionEngine for InProcessEngine {
    fn is_async_capable(&self) -> bool {
        true
    }

    async fn enqueue(&self, task: ExportTask) -> Result<EngineHandle, EngineError> {
        let sender = self.sender().ok_or(EngineError::Closed)?;
        let uuid = uuid::Uuid::new_v4().to_string();
        debug!(job_id = %task.job_id, handle = %uuid, channel = %task.channel, "Task enqueued");
        sender.send(task).map_err(|_| EngineError::Closed)?;
        Ok(EngineHandle { uuid: Some(uuid) })
    }
}

#[async_trait]
impl TaskSource for InProcessEngine {
    async fn next_task(&self) -> Option<ExportTask> {
        self.rx.lock().await.recv().await
    }
}
