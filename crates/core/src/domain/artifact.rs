// Artifact Domain Model (stored export output)

use serde::{Deserialize, Serialize};

/// Artifact identifier assigned by the blob store
pub type ArtifactId = i64;

/// Back-reference from an artifact to the entity that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactOwner {
    pub collection: String,
    pub id: String,
}

/// Artifact content to be stored
#[derive(Debug, Clone)]
pub struct NewArtifact {
    pub name: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub owner: ArtifactOwner,
}

/// Stored artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub name: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub owner: ArtifactOwner,
    pub created_at: i64, // epoch ms
}

/// Where a caller can download a finished export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultLocator {
    pub artifact_id: ArtifactId,
    pub file_name: String,
    pub url: String,
}
