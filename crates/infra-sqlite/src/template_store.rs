// SQLite TemplateStore Implementation

use crate::error::{corrupt_column, map_sqlx_error};
use async_trait::async_trait;
use jsonify_core::domain::TemplateId;
use jsonify_core::error::Result;
use jsonify_core::port::{TemplateStore, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteTemplateStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteTemplateStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl TemplateStore for SqliteTemplateStore {
    async fn parser_for(&self, id: TemplateId) -> Result<Option<serde_json::Value>> {
        let parser: Option<String> =
            sqlx::query_scalar("SELECT parser FROM export_templates WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        parser
            .map(|raw| serde_json::from_str(&raw).map_err(|e| corrupt_column("parser", e)))
            .transpose()
    }

    async fn insert(
        &self,
        name: &str,
        model_name: &str,
        parser: &serde_json::Value,
    ) -> Result<TemplateId> {
        let result = sqlx::query(
            "INSERT INTO export_templates (name, model_name, parser, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(model_name)
        .bind(parser.to_string())
        .bind(self.time_provider.now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use jsonify_core::port::time_provider::SystemTimeProvider;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_and_resolve_parser() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let store = SqliteTemplateStore::new(pool, Arc::new(SystemTimeProvider));

        let parser = json!({"fields": ["name", {"name": "email", "target": "mail"}]});
        let id = store
            .insert("Partner contact", "res.partner", &parser)
            .await
            .unwrap();

        assert_eq!(store.parser_for(id).await.unwrap(), Some(parser));
        assert_eq!(store.parser_for(id + 100).await.unwrap(), None);
    }
}
