// JSONify Infrastructure - SQLite Adapter
// Implements: ExportJobRepository, BlobStore, RecordStore, TemplateStore

mod blob_store;
mod connection;
mod error;
mod export_job_repository;
mod migration;
mod record_store;
mod template_store;

pub use blob_store::SqliteBlobStore;
pub use connection::create_pool;
pub use export_job_repository::SqliteExportJobRepository;
pub use migration::{current_version, run_migrations};
pub use record_store::SqliteRecordStore;
pub use template_store::SqliteTemplateStore;
