use std::sync::Arc;

use crate::domain::entity::product::{clean_description, NewProduct, Product};
use crate::domain::entity::webhook::WebhookEventType;
use crate::domain::repository::{DuplicateSku, ProductRepository};
use crate::domain::service::ProductEventNotifier;

#[derive(Debug, Clone)]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateProductError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("product with sku '{0}' already exists")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub struct CreateProductUseCase {
    repo: Arc<dyn ProductRepository>,
    notifier: Arc<dyn ProductEventNotifier>,
}

impl CreateProductUseCase {
    pub fn new(repo: Arc<dyn ProductRepository>, notifier: Arc<dyn ProductEventNotifier>) -> Self {
        Self { repo, notifier }
    }

    pub async fn execute(&self, input: &CreateProductInput) -> Result<Product, CreateProductError> {
        let sku = input.sku.trim();
        let name = input.name.trim();
        if sku.is_empty() || name.is_empty() {
            return Err(CreateProductError::Validation(
                "sku and name must not be empty".to_string(),
            ));
        }

        let existing = self
            .repo
            .find_by_sku(sku)
            .await
            .map_err(|e| CreateProductError::Internal(e.to_string()))?;
        if existing.is_some() {
            return Err(CreateProductError::Conflict(sku.to_string()));
        }

        let product = self
            .repo
            .create(&NewProduct::new(
                sku.to_string(),
                name.to_string(),
                clean_description(input.description.clone()),
                input.active,
            ))
            .await
            .map_err(|e| match DuplicateSku::sku_of(&e) {
                Some(sku) => CreateProductError::Conflict(sku.to_string()),
                None => CreateProductError::Internal(e.to_string()),
            })?;

        self.notifier
            .notify(WebhookEventType::ProductCreated, &product);

        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::product_repository::MockProductRepository;
    use crate::domain::service::product_event_notifier::MockProductEventNotifier;
    use chrono::Utc;

    fn stored(new: &NewProduct) -> Product {
        let now = Utc::now();
        Product {
            id: 1,
            sku: new.sku.clone(),
            name: new.name.clone(),
            description: new.description.clone(),
            active: new.active,
            created_at: now,
            updated_at: now,
        }
    }

    fn input(sku: &str) -> CreateProductInput {
        CreateProductInput {
            sku: sku.to_string(),
            name: " Widget ".to_string(),
            description: Some("".to_string()),
            active: true,
        }
    }

    #[tokio::test]
    async fn success_notifies_created() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_sku().returning(|_| Ok(None));
        repo.expect_create().returning(|p| Ok(stored(p)));

        let mut notifier = MockProductEventNotifier::new();
        notifier
            .expect_notify()
            .withf(|ev, p| *ev == WebhookEventType::ProductCreated && p.sku == "A1")
            .times(1)
            .return_const(());

        let uc = CreateProductUseCase::new(Arc::new(repo), Arc::new(notifier));
        let product = uc.execute(&input("A1")).await.unwrap();
        assert_eq!(product.name, "Widget");
        assert_eq!(product.description, None);
    }

    #[tokio::test]
    async fn concurrent_insert_of_same_sku_conflicts() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_sku().returning(|_| Ok(None));
        repo.expect_create()
            .returning(|p| Err(DuplicateSku(p.sku.clone()).into()));

        let mut notifier = MockProductEventNotifier::new();
        notifier.expect_notify().never();

        let uc = CreateProductUseCase::new(Arc::new(repo), Arc::new(notifier));
        assert!(matches!(
            uc.execute(&input("A1")).await,
            Err(CreateProductError::Conflict(ref sku)) if sku == "A1"
        ));
    }

    #[tokio::test]
    async fn duplicate_sku_conflicts() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_sku()
            .withf(|sku| sku == "abc-1")
            .returning(|_| {
                Ok(Some(stored(&NewProduct::new(
                    "ABC-1".to_string(),
                    "Existing".to_string(),
                    None,
                    true,
                ))))
            });
        repo.expect_create().never();

        let mut notifier = MockProductEventNotifier::new();
        notifier.expect_notify().never();

        let uc = CreateProductUseCase::new(Arc::new(repo), Arc::new(notifier));
        assert!(matches!(
            uc.execute(&input("abc-1")).await,
            Err(CreateProductError::Conflict(sku)) if sku == "abc-1"
        ));
    }

    #[tokio::test]
    async fn blank_sku_rejected() {
        let uc = CreateProductUseCase::new(
            Arc::new(MockProductRepository::new()),
            Arc::new(MockProductEventNotifier::new()),
        );
        assert!(matches!(
            uc.execute(&input("   ")).await,
            Err(CreateProductError::Validation(_))
        ));
    }
}
