// Projection Port
// Turns records plus a parser spec into JSON values. The projection DSL itself lives in adapters.

use crate::domain::Record;
use thiserror::Error;

/// Projection errors (message is captured verbatim on the failed job)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("Invalid parser: {0}")]
    InvalidParser(String),

    #[error("Projection failed for record {record_id}: {message}")]
    Record { record_id: i64, message: String },
}

/// Projection mechanism
pub trait Projector: Send + Sync {
    /// Project `records` in order; the output has one value per input record
    fn apply(
        &self,
        records: &[Record],
        parser: &serde_json::Value,
        with_field_names: bool,
    ) -> Result<Vec<serde_json::Value>, ProjectionError>;
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Emits `{"id": .., "name": ..}` (or `[id, name]` positionally) and counts calls
    #[derive(Default)]
    pub struct EchoProjector {
        calls: Mutex<Vec<usize>>,
        fail_on_call: Option<usize>,
    }

    impl EchoProjector {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail the n-th call (1-based)
        pub fn failing_on_call(n: usize) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on_call: Some(n),
            }
        }

        /// Batch sizes seen so far
        pub fn batch_sizes(&self) -> Vec<usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Projector for EchoProjector {
        fn apply(
            &self,
            records: &[Record],
            _parser: &serde_json::Value,
            with_field_names: bool,
        ) -> Result<Vec<serde_json::Value>, ProjectionError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(records.len());
                calls.len()
            };
            if self.fail_on_call == Some(call) {
                return Err(ProjectionError::InvalidParser(format!(
                    "mock failure on call {}",
                    call
                )));
            }
            Ok(records
                .iter()
                .map(|record| {
                    let name = record.get("name").unwrap_or(serde_json::Value::Null);
                    if with_field_names {
                        serde_json::json!({ "id": record.id, "name": name })
                    } else {
                        serde_json::json!([record.id, name])
                    }
                })
                .collect())
        }
    }
}
