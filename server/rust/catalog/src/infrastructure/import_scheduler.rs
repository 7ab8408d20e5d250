use std::sync::Arc;

use bytes::Bytes;
use catalog_telemetry::metrics::Metrics;
use tokio::sync::Semaphore;
use tracing::{error, info_span, Instrument};

use crate::domain::service::ImportJobScheduler;
use crate::usecase::ImportProductsUseCase;

/// TokioImportScheduler はインポートジョブを tokio タスクとして実行する。
/// 同時に実行されるジョブ数はセマフォで max_concurrent 件に制限され、
/// 超過分は許可が空くまで parsing のまま待機する。
pub struct TokioImportScheduler {
    worker: Arc<ImportProductsUseCase>,
    permits: Arc<Semaphore>,
    metrics: Arc<Metrics>,
}

impl TokioImportScheduler {
    pub fn new(worker: Arc<ImportProductsUseCase>, max_concurrent: usize, metrics: Arc<Metrics>) -> Self {
        Self {
            worker,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            metrics,
        }
    }
}

impl ImportJobScheduler for TokioImportScheduler {
    fn schedule(&self, job_id: String, content: Bytes) {
        let worker = self.worker.clone();
        let permits = self.permits.clone();
        let metrics = self.metrics.clone();
        let span = info_span!("import_job", job_id = %job_id);

        tokio::spawn(
            async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    error!("import scheduler closed; job abandoned");
                    return;
                };
                match worker.execute(&job_id, content).await {
                    Ok(summary) => {
                        metrics.record_import_job("complete");
                        metrics.record_import_rows("created", summary.created);
                        metrics.record_import_rows("updated", summary.updated);
                        metrics.record_import_rows("skipped", summary.skipped);
                    }
                    Err(e) => {
                        metrics.record_import_job("error");
                        error!(error = %e, "import job failed");
                    }
                }
            }
            .instrument(span),
        );
    }
}
