// Application Layer - Use Cases and Business Logic

pub mod availability;
pub mod callback;
pub mod export;
pub mod job_control;
pub mod recovery;
pub mod worker;

// Re-exports
pub use availability::ensure_async_capable;
pub use callback::{CallbackDispatcher, CallbackHandler, CallbackRegistry};
pub use export::{BatchExecutor, ExecutionOutcome, ExportError, SyncExportRequest, SyncExporter};
pub use job_control::{CreateExportRequest, JobController, StartReceipt};
pub use recovery::RecoveryService;
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker};
