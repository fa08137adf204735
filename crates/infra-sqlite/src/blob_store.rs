// SQLite BlobStore Implementation (artifacts table)

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use jsonify_core::domain::{Artifact, ArtifactId, ArtifactOwner, NewArtifact};
use jsonify_core::error::Result;
use jsonify_core::port::{BlobStore, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteBlobStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
    url_base: String,
}

impl SqliteBlobStore {
    /// `url_base` prefixes download locators, e.g. `/artifacts`
    pub fn new(
        pool: SqlitePool,
        time_provider: Arc<dyn TimeProvider>,
        url_base: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            time_provider,
            url_base: url_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn store(&self, artifact: NewArtifact) -> Result<ArtifactId> {
        let result = sqlx::query(
            r#"
            INSERT INTO artifacts (name, content_type, content, owner_collection, owner_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&artifact.name)
        .bind(&artifact.content_type)
        .bind(&artifact.content)
        .bind(&artifact.owner.collection)
        .bind(&artifact.owner.id)
        .bind(self.time_provider.now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.last_insert_rowid())
    }

    async fn fetch(&self, id: ArtifactId) -> Result<Option<Artifact>> {
        let row = sqlx::query_as::<_, ArtifactRow>("SELECT * FROM artifacts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ArtifactRow::into_artifact))
    }

    fn url_for(&self, id: ArtifactId) -> String {
        format!("{}/{}?download=true", self.url_base, id)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ArtifactRow {
    id: i64,
    name: String,
    content_type: String,
    content: Vec<u8>,
    owner_collection: String,
    owner_id: String,
    created_at: i64,
}

impl ArtifactRow {
    fn into_artifact(self) -> Artifact {
        Artifact {
            id: self.id,
            name: self.name,
            content_type: self.content_type,
            content: self.content,
            owner: ArtifactOwner {
                collection: self.owner_collection,
                id: self.owner_id,
            },
            created_at: self.created_at,
        }
    }
}
