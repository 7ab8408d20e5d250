use std::sync::Arc;

use crate::domain::entity::product::Product;
use crate::domain::repository::ProductRepository;

#[derive(Debug, thiserror::Error)]
pub enum GetProductError {
    #[error("product not found: {0}")]
    NotFound(i64),
    #[error("internal error: {0}")]
    Internal(String),
}

pub struct GetProductUseCase {
    repo: Arc<dyn ProductRepository>,
}

impl GetProductUseCase {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, id: i64) -> Result<Product, GetProductError> {
        self.repo
            .find_by_id(id)
            .await
            .map_err(|e| GetProductError::Internal(e.to_string()))?
            .ok_or(GetProductError::NotFound(id))
    }
}
