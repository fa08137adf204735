// Domain Layer - Pure business logic and entities

pub mod artifact;
pub mod error;
pub mod export_job;
pub mod record;

// Re-exports
pub use artifact::{Artifact, ArtifactId, ArtifactOwner, NewArtifact, ResultLocator};
pub use error::DomainError;
pub use export_job::{
    CallbackTarget, ExportJob, ExportState, JobId, TemplateId, CANCELLED_MESSAGE,
    DEFAULT_BATCH_SIZE, JOB_COLLECTION,
};
pub use record::{Record, RecordId};
