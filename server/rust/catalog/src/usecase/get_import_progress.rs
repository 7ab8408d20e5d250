use std::sync::Arc;

use crate::domain::entity::import_progress::ImportProgress;
use crate::domain::repository::ImportProgressStore;

#[derive(Debug, thiserror::Error)]
pub enum GetImportProgressError {
    #[error("Job not found")]
    NotFound(String),
}

pub struct GetImportProgressUseCase {
    store: Arc<dyn ImportProgressStore>,
}

impl GetImportProgressUseCase {
    pub fn new(store: Arc<dyn ImportProgressStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, job_id: &str) -> Result<ImportProgress, GetImportProgressError> {
        self.store
            .get(job_id)
            .await
            .ok_or_else(|| GetImportProgressError::NotFound(job_id.to_string()))
    }
}
