// Blob Store Port (durable artifact storage)

use crate::domain::{Artifact, ArtifactId, NewArtifact};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist an artifact and return its id
    async fn store(&self, artifact: NewArtifact) -> Result<ArtifactId>;

    /// Fetch a stored artifact
    async fn fetch(&self, id: ArtifactId) -> Result<Option<Artifact>>;

    /// Retrieval locator for a stored artifact
    fn url_for(&self, id: ArtifactId) -> String;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryBlobStore {
        artifacts: Mutex<Vec<Artifact>>,
        fail_with: Mutex<Option<String>>,
    }

    impl InMemoryBlobStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_with(&self, message: impl Into<String>) {
            *self.fail_with.lock().unwrap() = Some(message.into());
        }

        pub fn artifacts(&self) -> Vec<Artifact> {
            self.artifacts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BlobStore for InMemoryBlobStore {
        async fn store(&self, artifact: NewArtifact) -> Result<ArtifactId> {
            if let Some(message) = self.fail_with.lock().unwrap().clone() {
                return Err(AppError::Database(message));
            }
            let mut artifacts = self.artifacts.lock().unwrap();
            let id = artifacts.len() as ArtifactId + 1;
            artifacts.push(Artifact {
                id,
                name: artifact.name,
                content_type: artifact.content_type,
                content: artifact.content,
                owner: artifact.owner,
                created_at: 0,
            });
            Ok(id)
        }

        async fn fetch(&self, id: ArtifactId) -> Result<Option<Artifact>> {
            Ok(self
                .artifacts
                .lock()
                .unwrap()
                .iter()
                .find(|artifact| artifact.id == id)
                .cloned())
        }

        fn url_for(&self, id: ArtifactId) -> String {
            format!("/artifacts/{}?download=true", id)
        }
    }
}
