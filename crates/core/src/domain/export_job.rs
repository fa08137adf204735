// Export Job Domain Model

use crate::domain::artifact::ArtifactId;
use crate::domain::error::{DomainError, Result};
use crate::domain::record::RecordId;
use serde::{Deserialize, Serialize};

/// Job ID (UUID v4)
pub type JobId = String;

/// Export template identifier
pub type TemplateId = i64;

/// Records per batch when the job does not configure a usable value
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Error message written by `cancel`
pub const CANCELLED_MESSAGE: &str = "Cancelled by user";

/// Collection name used when other entities point back at export jobs
pub const JOB_COLLECTION: &str = "jsonify.job";

/// Export job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportState {
    Pending,
    Processing,
    Done,
    Failed,
}

impl std::fmt::Display for ExportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportState::Pending => write!(f, "PENDING"),
            ExportState::Processing => write!(f, "PROCESSING"),
            ExportState::Done => write!(f, "DONE"),
            ExportState::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for ExportState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(ExportState::Pending),
            "PROCESSING" => Ok(ExportState::Processing),
            "DONE" => Ok(ExportState::Done),
            "FAILED" => Ok(ExportState::Failed),
            other => Err(DomainError::ValidationError(format!(
                "unknown export state: {}",
                other
            ))),
        }
    }
}

/// Hook invoked once a job reaches Done
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackTarget {
    pub collection: String,
    pub method: String,
    pub record_id: Option<RecordId>,
}

impl CallbackTarget {
    pub fn new(
        collection: impl Into<String>,
        method: impl Into<String>,
        record_id: Option<RecordId>,
    ) -> Self {
        Self {
            collection: collection.into(),
            method: method.into(),
            record_id,
        }
    }

    /// Parse the persisted `collection.method` form (split on the last dot)
    ///
    /// `"res.partner.on_export_done"` targets collection `res.partner`,
    /// method `on_export_done`.
    pub fn parse(spec: &str, record_id: Option<RecordId>) -> Result<Self> {
        match spec.rsplit_once('.') {
            Some((collection, method)) if !collection.is_empty() && !method.is_empty() => {
                Ok(Self::new(collection, method, record_id))
            }
            _ => Err(DomainError::InvalidCallback(format!(
                "expected 'collection.method', got '{}'",
                spec
            ))),
        }
    }

    /// Persisted `collection.method` form
    pub fn method_path(&self) -> String {
        format!("{}.{}", self.collection, self.method)
    }
}

/// Export Job Entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: JobId,
    pub name: String,
    pub state: ExportState,

    // Source configuration
    pub model_name: String,
    pub record_ids: Vec<RecordId>,
    pub export_template_id: Option<TemplateId>,
    pub parser: Option<serde_json::Value>,

    // Processing options
    pub batch_size: i64,
    pub with_field_names: bool,

    // Results
    pub result_artifact_id: Option<ArtifactId>,
    pub result_count: Option<u64>,
    pub error_message: Option<String>,

    // Timing (epoch ms)
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,

    // Engine correlation token
    pub execution_handle: Option<String>,

    pub callback: Option<CallbackTarget>,
}

impl ExportJob {
    /// Create a new pending job
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `name` - Human description
    /// * `model_name` - Collection the records belong to
    /// * `record_ids` - Ordered record identifiers to export
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        name: impl Into<String>,
        model_name: impl Into<String>,
        record_ids: Vec<RecordId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: ExportState::Pending,
            model_name: model_name.into(),
            record_ids,
            export_template_id: None,
            parser: None,
            batch_size: DEFAULT_BATCH_SIZE as i64,
            with_field_names: false,
            result_artifact_id: None,
            result_count: None,
            error_message: None,
            created_at,
            started_at: None,
            completed_at: None,
            execution_handle: None,
            callback: None,
        }
    }

    /// Default label for jobs created without a name
    pub fn default_name(now_millis: i64) -> String {
        let stamp = chrono::DateTime::from_timestamp_millis(now_millis)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| now_millis.to_string());
        format!("JSON Export {}", stamp)
    }

    /// File name of the result artifact
    pub fn artifact_file_name(&self) -> String {
        format!("{}.json", self.name)
    }

    /// Pending -> Processing
    pub fn start(&mut self, now_millis: i64) -> Result<()> {
        if self.state != ExportState::Pending {
            return Err(self.invalid("Job can only be started from pending state"));
        }
        self.state = ExportState::Processing;
        self.started_at = Some(now_millis);
        self.completed_at = None;
        Ok(())
    }

    /// Processing -> Done, recording the stored artifact
    pub fn complete(&mut self, now_millis: i64, artifact_id: ArtifactId, count: u64) -> Result<()> {
        if self.state != ExportState::Processing {
            return Err(self.invalid("Job can only be completed while processing"));
        }
        self.state = ExportState::Done;
        self.completed_at = Some(self.clamp_completion(now_millis));
        self.result_artifact_id = Some(artifact_id);
        self.result_count = Some(count);
        Ok(())
    }

    /// Processing -> Failed
    ///
    /// An empty message is replaced so a failed job always explains itself.
    pub fn fail(&mut self, now_millis: i64, message: impl Into<String>) -> Result<()> {
        if self.state != ExportState::Processing {
            return Err(self.invalid("Job can only fail while processing"));
        }
        let message = message.into();
        self.state = ExportState::Failed;
        self.completed_at = Some(self.clamp_completion(now_millis));
        self.result_artifact_id = None;
        self.result_count = None;
        self.error_message = Some(if message.trim().is_empty() {
            "export failed".to_string()
        } else {
            message
        });
        Ok(())
    }

    /// Pending | Processing -> Failed with the cancellation message
    ///
    /// Marks intent only. An execution already running is not interrupted and
    /// may still overwrite this with its own outcome. A started attempt gets its
    /// `completed_at` stamped.
    pub fn cancel(&mut self, now_millis: i64) -> Result<()> {
        match self.state {
            ExportState::Pending | ExportState::Processing => {
                if self.started_at.is_some() {
                    self.completed_at = Some(self.clamp_completion(now_millis));
                }
                self.state = ExportState::Failed;
                self.error_message = Some(CANCELLED_MESSAGE.to_string());
                Ok(())
            }
            _ => Err(self.invalid("Only pending or processing jobs can be cancelled")),
        }
    }

    /// Failed -> Pending, clearing the previous attempt
    pub fn reset_for_retry(&mut self) -> Result<()> {
        if self.state != ExportState::Failed {
            return Err(self.invalid("Only failed jobs can be retried"));
        }
        self.state = ExportState::Pending;
        self.error_message = None;
        self.started_at = None;
        self.completed_at = None;
        self.result_artifact_id = None;
        self.result_count = None;
        Ok(())
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == ExportState::Failed
            && self.error_message.as_deref() == Some(CANCELLED_MESSAGE)
    }

    // completed_at must never precede started_at, even with a skewed clock
    fn clamp_completion(&self, now_millis: i64) -> i64 {
        match self.started_at {
            Some(started) => now_millis.max(started),
            None => now_millis,
        }
    }

    fn invalid(&self, message: &str) -> DomainError {
        DomainError::InvalidState {
            message: message.to_string(),
            state: self.state.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ExportJob {
        ExportJob::new("job-1", 1_000, "Partners", "res.partner", vec![1, 2, 3])
    }

    #[test]
    fn test_new_job_is_pending_with_defaults() {
        let job = job();
        assert_eq!(job.state, ExportState::Pending);
        assert_eq!(job.batch_size, 100);
        assert!(!job.with_field_names);
        assert!(job.result_artifact_id.is_none());
        assert!(job.result_count.is_none());
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_lifecycle_to_done() {
        let mut job = job();
        job.start(2_000).unwrap();
        assert_eq!(job.state, ExportState::Processing);
        assert_eq!(job.started_at, Some(2_000));

        job.complete(3_000, 7, 3).unwrap();
        assert_eq!(job.state, ExportState::Done);
        assert_eq!(job.completed_at, Some(3_000));
        assert_eq!(job.result_artifact_id, Some(7));
        assert_eq!(job.result_count, Some(3));
    }

    #[test]
    fn test_start_only_from_pending() {
        let mut job = job();
        job.start(2_000).unwrap();
        let before = job.clone();

        let err = job.start(3_000).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
        assert_eq!(job, before, "failed transition must not touch the job");
    }

    #[test]
    fn test_fail_records_message_and_clears_results() {
        let mut job = job();
        job.start(2_000).unwrap();
        job.fail(2_500, "projection exploded").unwrap();

        assert_eq!(job.state, ExportState::Failed);
        assert_eq!(job.error_message.as_deref(), Some("projection exploded"));
        assert!(job.result_artifact_id.is_none());
        assert!(job.result_count.is_none());
    }

    #[test]
    fn test_fail_with_empty_message_still_explains() {
        let mut job = job();
        job.start(2_000).unwrap();
        job.fail(2_500, "  ").unwrap();
        assert_eq!(job.error_message.as_deref(), Some("export failed"));
    }

    #[test]
    fn test_completed_at_never_before_started_at() {
        let mut job = job();
        job.start(5_000).unwrap();
        job.complete(4_000, 1, 1).unwrap();
        assert_eq!(job.completed_at, Some(5_000));
    }

    #[test]
    fn test_cancel_from_pending_and_processing() {
        let mut pending = job();
        pending.cancel(1_500).unwrap();
        assert!(pending.is_cancelled());
        assert!(pending.completed_at.is_none());

        let mut processing = job();
        processing.start(2_000).unwrap();
        processing.cancel(1_000).unwrap();
        assert_eq!(processing.state, ExportState::Failed);
        assert_eq!(processing.error_message.as_deref(), Some(CANCELLED_MESSAGE));
        assert_eq!(processing.completed_at, Some(2_000), "clamped to started_at");
    }

    #[test]
    fn test_cancel_rejected_when_done() {
        let mut job = job();
        job.start(2_000).unwrap();
        job.complete(3_000, 1, 3).unwrap();
        let before = job.clone();

        assert!(job.cancel(4_000).is_err());
        assert_eq!(job, before);
    }

    #[test]
    fn test_retry_only_from_failed_and_clears_attempt() {
        let mut job = job();
        assert!(job.reset_for_retry().is_err());

        job.start(2_000).unwrap();
        job.fail(3_000, "boom").unwrap();
        job.reset_for_retry().unwrap();

        assert_eq!(job.state, ExportState::Pending);
        assert!(job.error_message.is_none());
        assert!(job.started_at.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_callback_target_parse_splits_on_last_dot() {
        let target = CallbackTarget::parse("res.partner.on_export_done", Some(4)).unwrap();
        assert_eq!(target.collection, "res.partner");
        assert_eq!(target.method, "on_export_done");
        assert_eq!(target.record_id, Some(4));
        assert_eq!(target.method_path(), "res.partner.on_export_done");

        assert!(CallbackTarget::parse("no_dot", None).is_err());
        assert!(CallbackTarget::parse("trailing.", None).is_err());
    }

    #[test]
    fn test_state_round_trips_through_text() {
        for state in [
            ExportState::Pending,
            ExportState::Processing,
            ExportState::Done,
            ExportState::Failed,
        ] {
            let parsed: ExportState = state.to_string().parse().unwrap();
            assert_eq!(parsed, state);
        }
        assert!("QUEUED".parse::<ExportState>().is_err());
    }

    #[test]
    fn test_default_name_is_timestamped() {
        // 2024-01-02 03:04 UTC
        let name = ExportJob::default_name(1_704_164_640_000);
        assert_eq!(name, "JSON Export 2024-01-02 03:04");
    }
}
