// Record Domain Model

use serde::{Deserialize, Serialize};

/// Identifier of a record inside its collection
pub type RecordId = i64;

/// A business record as handed out by the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    pub fn new(id: RecordId, fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { id, fields }
    }

    /// Look up a field; `id` is always available even when not stored in `fields`
    pub fn get(&self, field: &str) -> Option<serde_json::Value> {
        match self.fields.get(field) {
            Some(value) => Some(value.clone()),
            None if field == "id" => Some(serde_json::Value::from(self.id)),
            None => None,
        }
    }
}
