use std::sync::Arc;

use bytes::Bytes;
use uuid::Uuid;

use crate::domain::entity::import_progress::ImportProgress;
use crate::domain::repository::ImportProgressStore;
use crate::domain::service::ImportJobScheduler;

#[derive(Debug, Clone)]
pub struct SubmitImportInput {
    pub filename: Option<String>,
    pub content: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitImportOutput {
    pub job_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitImportError {
    #[error("{0}")]
    InvalidFile(String),
}

/// SubmitImportUseCase はアップロードされた CSV にジョブ ID を割り当て、
/// ワーカーの完了を待たずに返す。
pub struct SubmitImportUseCase {
    store: Arc<dyn ImportProgressStore>,
    scheduler: Arc<dyn ImportJobScheduler>,
}

impl SubmitImportUseCase {
    pub fn new(store: Arc<dyn ImportProgressStore>, scheduler: Arc<dyn ImportJobScheduler>) -> Self {
        Self { store, scheduler }
    }

    pub async fn execute(
        &self,
        input: SubmitImportInput,
    ) -> Result<SubmitImportOutput, SubmitImportError> {
        let is_csv = input
            .filename
            .as_deref()
            .is_some_and(|name| name.to_ascii_lowercase().ends_with(".csv"));
        if !is_csv {
            return Err(SubmitImportError::InvalidFile(
                "File must be a CSV file".to_string(),
            ));
        }

        let job_id = Uuid::new_v4().to_string();
        self.store
            .set(&job_id, ImportProgress::new(job_id.clone()))
            .await;
        self.scheduler.schedule(job_id.clone(), input.content);

        tracing::info!(
            job_id = %job_id,
            filename = input.filename.as_deref().unwrap_or_default(),
            "import job submitted"
        );
        Ok(SubmitImportOutput { job_id })
    }
}
