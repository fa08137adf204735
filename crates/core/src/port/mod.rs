// Port Layer - Interfaces for external dependencies

pub mod blob_store;
pub mod execution_engine;
pub mod export_job_repository;
pub mod id_provider; // For deterministic testing
pub mod projector;
pub mod record_store;
pub mod template_store;
pub mod time_provider;

// Re-exports
pub use blob_store::BlobStore;
pub use execution_engine::{
    EngineError, EngineHandle, ExecutionEngine, ExportTask, TaskSource, UnavailableEngine,
};
pub use export_job_repository::ExportJobRepository;
pub use id_provider::IdProvider;
pub use projector::{ProjectionError, Projector};
pub use record_store::{RecordStore, RecordWriter};
pub use template_store::TemplateStore;
pub use time_provider::TimeProvider;
