// Export Job Repository Port (Interface)

use crate::domain::{ExportJob, ExportState, JobId};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for ExportJob persistence
#[async_trait]
pub trait ExportJobRepository: Send + Sync {
    /// Insert a new job (all columns)
    async fn insert(&self, job: &ExportJob) -> Result<()>;

    /// Find job by ID
    async fn find_by_id(&self, id: &JobId) -> Result<Option<ExportJob>>;

    /// Write every mutable column in one statement, except `execution_handle`
    async fn update(&self, job: &ExportJob) -> Result<()>;

    /// Write only the engine handle
    async fn set_execution_handle(&self, id: &JobId, handle: Option<&str>) -> Result<()>;

    /// Find all jobs by state, oldest first
    async fn find_by_state(&self, state: ExportState) -> Result<Vec<ExportJob>>;

    /// Most recently created jobs first
    async fn list_recent(&self, limit: usize) -> Result<Vec<ExportJob>>;

    /// Count jobs by state
    async fn count_by_state(&self, state: ExportState) -> Result<i64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory repository
    #[derive(Default)]
    pub struct InMemoryExportJobRepository {
        jobs: Mutex<HashMap<JobId, ExportJob>>,
        update_count: Mutex<usize>,
    }

    impl InMemoryExportJobRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of a stored job (test helper)
        pub fn get(&self, id: &str) -> Option<ExportJob> {
            self.jobs.lock().unwrap().get(id).cloned()
        }

        pub fn update_count(&self) -> usize {
            *self.update_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl ExportJobRepository for InMemoryExportJobRepository {
        async fn insert(&self, job: &ExportJob) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            if jobs.contains_key(&job.id) {
                return Err(AppError::Database(format!(
                    "Unique constraint violation: {}",
                    job.id
                )));
            }
            jobs.insert(job.id.clone(), job.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &JobId) -> Result<Option<ExportJob>> {
            Ok(self.jobs.lock().unwrap().get(id).cloned())
        }

        async fn update(&self, job: &ExportJob) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            let stored = jobs
                .get_mut(&job.id)
                .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job.id)))?;
            let handle = stored.execution_handle.take();
            *stored = job.clone();
            stored.execution_handle = handle;
            *self.update_count.lock().unwrap() += 1;
            Ok(())
        }

        async fn set_execution_handle(&self, id: &JobId, handle: Option<&str>) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            let stored = jobs
                .get_mut(id)
                .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))?;
            stored.execution_handle = handle.map(str::to_string);
            Ok(())
        }

        async fn find_by_state(&self, state: ExportState) -> Result<Vec<ExportJob>> {
            let mut found: Vec<ExportJob> = self
                .jobs
                .lock()
                .unwrap()
                .values()
                .filter(|job| job.state == state)
                .cloned()
                .collect();
            found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            Ok(found)
        }

        async fn list_recent(&self, limit: usize) -> Result<Vec<ExportJob>> {
            let mut all: Vec<ExportJob> = self.jobs.lock().unwrap().values().cloned().collect();
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            all.truncate(limit);
            Ok(all)
        }

        async fn count_by_state(&self, state: ExportState) -> Result<i64> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .values()
                .filter(|job| job.state == state)
                .count() as i64)
        }
    }
}
