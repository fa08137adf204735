// Record Store Port
// The business-object store is an external collaborator; only its lookup contract lives here.

use crate::domain::{Record, RecordId};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Ids from `ids` that still exist, in input order
    ///
    /// Missing ids are dropped silently; duplicates are kept.
    async fn filter_existing(&self, model: &str, ids: &[RecordId]) -> Result<Vec<RecordId>>;

    /// Load existing records, order-preserving, dropping missing ids
    async fn resolve(&self, model: &str, ids: &[RecordId]) -> Result<Vec<Record>>;
}

/// Write side of a locally hosted record store
#[async_trait]
pub trait RecordWriter: Send + Sync {
    /// Insert or replace records of `model`; returns how many were written
    async fn upsert(&self, model: &str, records: &[Record]) -> Result<usize>;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory record store keyed by model then id
    #[derive(Default)]
    pub struct InMemoryRecordStore {
        records: Mutex<HashMap<String, HashMap<RecordId, Record>>>,
        resolve_calls: Mutex<Vec<Vec<RecordId>>>,
        fail_with: Mutex<Option<String>>,
    }

    impl InMemoryRecordStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, model: &str, record: Record) {
            self.records
                .lock()
                .unwrap()
                .entry(model.to_string())
                .or_default()
                .insert(record.id, record);
        }

        /// Insert records `{ "id": n, "name": "<prefix> n" }` for each id
        pub fn seed(&self, model: &str, ids: &[RecordId], prefix: &str) {
            for &id in ids {
                let mut fields = serde_json::Map::new();
                fields.insert("name".to_string(), format!("{} {}", prefix, id).into());
                self.insert(model, Record::new(id, fields));
            }
        }

        pub fn remove(&self, model: &str, id: RecordId) {
            if let Some(by_id) = self.records.lock().unwrap().get_mut(model) {
                by_id.remove(&id);
            }
        }

        /// Make every call fail with the given message
        pub fn fail_with(&self, message: impl Into<String>) {
            *self.fail_with.lock().unwrap() = Some(message.into());
        }

        /// Id slices passed to `resolve`, in call order
        pub fn resolve_calls(&self) -> Vec<Vec<RecordId>> {
            self.resolve_calls.lock().unwrap().clone()
        }

        fn check_failure(&self) -> Result<()> {
            match self.fail_with.lock().unwrap().clone() {
                Some(message) => Err(AppError::Database(message)),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl RecordStore for InMemoryRecordStore {
        async fn filter_existing(&self, model: &str, ids: &[RecordId]) -> Result<Vec<RecordId>> {
            self.check_failure()?;
            let records = self.records.lock().unwrap();
            let Some(by_id) = records.get(model) else {
                return Ok(Vec::new());
            };
            Ok(ids.iter().copied().filter(|id| by_id.contains_key(id)).collect())
        }

        async fn resolve(&self, model: &str, ids: &[RecordId]) -> Result<Vec<Record>> {
            self.check_failure()?;
            self.resolve_calls.lock().unwrap().push(ids.to_vec());
            let records = self.records.lock().unwrap();
            let Some(by_id) = records.get(model) else {
                return Ok(Vec::new());
            };
            Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
        }
    }

    #[async_trait]
    impl RecordWriter for InMemoryRecordStore {
        async fn upsert(&self, model: &str, records: &[Record]) -> Result<usize> {
            self.check_failure()?;
            for record in records {
                self.insert(model, record.clone());
            }
            Ok(records.len())
        }
    }
}
