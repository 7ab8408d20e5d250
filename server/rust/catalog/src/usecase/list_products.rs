use std::sync::Arc;

use crate::domain::entity::product::{Product, ProductFilter};
use crate::domain::repository::ProductRepository;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone)]
pub struct ListProductsInput {
    pub filter: ProductFilter,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone)]
pub struct ListProductsOutput {
    pub items: Vec<Product>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ListProductsError {
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub struct ListProductsUseCase {
    repo: Arc<dyn ProductRepository>,
}

impl ListProductsUseCase {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(
        &self,
        input: &ListProductsInput,
    ) -> Result<ListProductsOutput, ListProductsError> {
        if input.page < 1 {
            return Err(ListProductsError::InvalidPagination(
                "page must be >= 1".to_string(),
            ));
        }
        if input.page_size < 1 || input.page_size > MAX_PAGE_SIZE {
            return Err(ListProductsError::InvalidPagination(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let (items, total) = self
            .repo
            .find_all(&input.filter, input.page, input.page_size)
            .await
            .map_err(|e| ListProductsError::Internal(e.to_string()))?;

        Ok(ListProductsOutput {
            items,
            total,
            page: input.page,
            page_size: input.page_size,
            total_pages: total.div_ceil(u64::from(input.page_size)),
        })
    }
}
