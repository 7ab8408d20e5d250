use std::sync::Arc;

use crate::domain::entity::webhook::WebhookEventType;
use crate::domain::repository::ProductRepository;
use crate::domain::service::ProductEventNotifier;

#[derive(Debug, thiserror::Error)]
pub enum DeleteProductError {
    #[error("product not found: {0}")]
    NotFound(i64),
    #[error("internal error: {0}")]
    Internal(String),
}

pub struct DeleteProductUseCase {
    repo: Arc<dyn ProductRepository>,
    notifier: Arc<dyn ProductEventNotifier>,
}

impl DeleteProductUseCase {
    pub fn new(repo: Arc<dyn ProductRepository>, notifier: Arc<dyn ProductEventNotifier>) -> Self {
        Self { repo, notifier }
    }

    /// execute は商品を削除し、削除前の内容で product_deleted を通知する。
    pub async fn execute(&self, id: i64) -> Result<(), DeleteProductError> {
        let product = self
            .repo
            .find_by_id(id)
            .await
            .map_err(|e| DeleteProductError::Internal(e.to_string()))?
            .ok_or(DeleteProductError::NotFound(id))?;

        let deleted = self
            .repo
            .delete(id)
            .await
            .map_err(|e| DeleteProductError::Internal(e.to_string()))?;
        if !deleted {
            return Err(DeleteProductError::NotFound(id));
        }

        self.notifier
            .notify(WebhookEventType::ProductDeleted, &product);
        Ok(())
    }
}

/// DeleteAllProductsUseCase は全商品を削除する。通知は行わない。
pub struct DeleteAllProductsUseCase {
    repo: Arc<dyn ProductRepository>,
}

impl DeleteAllProductsUseCase {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self) -> Result<u64, DeleteProductError> {
        let count = self
            .repo
            .delete_all()
            .await
            .map_err(|e| DeleteProductError::Internal(e.to_string()))?;
        tracing::info!(deleted = count, "all products deleted");
        Ok(count)
    }
}
