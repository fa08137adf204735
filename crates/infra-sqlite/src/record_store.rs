// SQLite RecordStore Implementation (records table, one JSON document per record)

use crate::error::{corrupt_column, map_sqlx_error};
use async_trait::async_trait;
use jsonify_core::domain::{Record, RecordId};
use jsonify_core::error::{AppError, Result};
use jsonify_core::port::{RecordStore, RecordWriter, TimeProvider};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Ids per `IN (...)` clause, well below SQLite's bound-parameter limit
const LOOKUP_CHUNK: usize = 500;

pub struct SqliteRecordStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// Existing ids of `model` among one chunk
    async fn existing_ids(&self, model: &str, ids: &[RecordId]) -> Result<HashSet<RecordId>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id FROM records WHERE model = ");
        query.push_bind(model).push(" AND id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let found: Vec<i64> = query
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(found.into_iter().collect())
    }

    /// Rows of `model` among one chunk, keyed by id
    async fn load_rows(&self, model: &str, ids: &[RecordId]) -> Result<HashMap<RecordId, Record>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, data FROM records WHERE model = ");
        query.push_bind(model).push(" AND id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<(i64, String)> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|(id, data)| {
                let fields: serde_json::Map<String, serde_json::Value> =
                    serde_json::from_str(&data).map_err(|e| corrupt_column("data", e))?;
                Ok((id, Record::new(id, fields)))
            })
            .collect()
    }
}

#[async_trait]
impl RecordWriter for SqliteRecordStore {
    /// Insert or replace records of `model` in one transaction
    ///
    /// The `id` key inside `fields` is ignored; `Record::id` is authoritative.
    async fn upsert(&self, model: &str, records: &[Record]) -> Result<usize> {
        if model.trim().is_empty() {
            return Err(AppError::Validation("model cannot be empty".to_string()));
        }

        let now = self.time_provider.now_millis();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        for record in records {
            let mut fields = record.fields.clone();
            fields.remove("id");
            sqlx::query(
                r#"
                INSERT INTO records (model, id, data, updated_at) VALUES (?, ?, ?, ?)
                ON CONFLICT(model, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
                "#,
            )
            .bind(model)
            .bind(record.id)
            .bind(serde_json::Value::Object(fields).to_string())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(model = %model, count = records.len(), "Records upserted");
        Ok(records.len())
    }
}

/// Distinct ids in first-seen order
fn distinct(ids: &[RecordId]) -> Vec<RecordId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn filter_existing(&self, model: &str, ids: &[RecordId]) -> Result<Vec<RecordId>> {
        let mut existing = HashSet::new();
        for chunk in distinct(ids).chunks(LOOKUP_CHUNK) {
            existing.extend(self.existing_ids(model, chunk).await?);
        }
        Ok(ids.iter().copied().filter(|id| existing.contains(id)).collect())
    }

    async fn resolve(&self, model: &str, ids: &[RecordId]) -> Result<Vec<Record>> {
        let mut loaded = HashMap::new();
        for chunk in distinct(ids).chunks(LOOKUP_CHUNK) {
            loaded.extend(self.load_rows(model, chunk).await?);
        }
        Ok(ids.iter().filter_map(|id| loaded.get(id).cloned()).collect())
    }
}
