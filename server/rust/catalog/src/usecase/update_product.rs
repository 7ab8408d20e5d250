use std::sync::Arc;

use chrono::Utc;

use crate::domain::entity::product::{clean_description, Product};
use crate::domain::entity::webhook::WebhookEventType;
use crate::domain::repository::{DuplicateSku, ProductRepository};
use crate::domain::service::ProductEventNotifier;

/// UpdateProductInput は部分更新の内容。None のフィールドは変更しない。
/// description の `Some(None)` は説明の削除を意味する。
#[derive(Debug, Clone, Default)]
pub struct UpdateProductInput {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub active: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateProductError {
    #[error("product not found: {0}")]
    NotFound(i64),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("product with sku '{0}' already exists")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub struct UpdateProductUseCase {
    repo: Arc<dyn ProductRepository>,
    notifier: Arc<dyn ProductEventNotifier>,
}

impl UpdateProductUseCase {
    pub fn new(repo: Arc<dyn ProductRepository>, notifier: Arc<dyn ProductEventNotifier>) -> Self {
        Self { repo, notifier }
    }

    pub async fn execute(
        &self,
        id: i64,
        input: &UpdateProductInput,
    ) -> Result<Product, UpdateProductError> {
        let mut product = self
            .repo
            .find_by_id(id)
            .await
            .map_err(|e| UpdateProductError::Internal(e.to_string()))?
            .ok_or(UpdateProductError::NotFound(id))?;

        if let Some(ref sku) = input.sku {
            let sku = sku.trim();
            if sku.is_empty() {
                return Err(UpdateProductError::Validation(
                    "sku must not be empty".to_string(),
                ));
            }
            let other = self
                .repo
                .find_by_sku(sku)
                .await
                .map_err(|e| UpdateProductError::Internal(e.to_string()))?;
            if matches!(other, Some(ref o) if o.id != id) {
                return Err(UpdateProductError::Conflict(sku.to_string()));
            }
            product.sku = sku.to_string();
        }
        if let Some(ref name) = input.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(UpdateProductError::Validation(
                    "name must not be empty".to_string(),
                ));
            }
            product.name = name.to_string();
        }
        if let Some(ref description) = input.description {
            product.description = clean_description(description.clone());
        }
        if let Some(active) = input.active {
            product.active = active;
        }
        product.updated_at = Utc::now();

        self.repo
            .update(&product)
            .await
            .map_err(|e| match DuplicateSku::sku_of(&e) {
                Some(sku) => UpdateProductError::Conflict(sku.to_string()),
                None => UpdateProductError::Internal(e.to_string()),
            })?;

        self.notifier
            .notify(WebhookEventType::ProductUpdated, &product);

        Ok(product)
    }
}
