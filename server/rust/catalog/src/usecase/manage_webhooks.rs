use std::sync::Arc;

use crate::domain::entity::webhook::{NewWebhook, Webhook, WebhookEventType};
use crate::domain::repository::WebhookRepository;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook not found: {0}")]
    NotFound(i64),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

fn validate_url(url: &str) -> Result<(), WebhookError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(WebhookError::Validation(
            "url must use http or https".to_string(),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct CreateWebhookInput {
    pub url: String,
    pub event_type: WebhookEventType,
    pub enabled: bool,
}

/// UpdateWebhookInput は部分更新の内容。None のフィールドは変更しない。
#[derive(Debug, Clone, Default)]
pub struct UpdateWebhookInput {
    pub url: Option<String>,
    pub event_type: Option<WebhookEventType>,
    pub enabled: Option<bool>,
}

pub struct ListWebhooksUseCase {
    repo: Arc<dyn WebhookRepository>,
}

impl ListWebhooksUseCase {
    pub fn new(repo: Arc<dyn WebhookRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self) -> Result<Vec<Webhook>, WebhookError> {
        self.repo
            .find_all()
            .await
            .map_err(|e| WebhookError::Internal(e.to_string()))
    }
}

pub struct CreateWebhookUseCase {
    repo: Arc<dyn WebhookRepository>,
}

impl CreateWebhookUseCase {
    pub fn new(repo: Arc<dyn WebhookRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, input: &CreateWebhookInput) -> Result<Webhook, WebhookError> {
        let url = input.url.trim();
        validate_url(url)?;
        self.repo
            .create(&NewWebhook {
                url: url.to_string(),
                event_type: input.event_type,
                enabled: input.enabled,
            })
            .await
            .map_err(|e| WebhookError::Internal(e.to_string()))
    }
}

pub struct UpdateWebhookUseCase {
    repo: Arc<dyn WebhookRepository>,
}

impl UpdateWebhookUseCase {
    pub fn new(repo: Arc<dyn WebhookRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(
        &self,
        id: i64,
        input: &UpdateWebhookInput,
    ) -> Result<Webhook, WebhookError> {
        let mut webhook = self
            .repo
            .find_by_id(id)
            .await
            .map_err(|e| WebhookError::Internal(e.to_string()))?
            .ok_or(WebhookError::NotFound(id))?;

        if let Some(ref url) = input.url {
            let url = url.trim();
            validate_url(url)?;
            webhook.url = url.to_string();
        }
        if let Some(event_type) = input.event_type {
            webhook.event_type = event_type;
        }
        if let Some(enabled) = input.enabled {
            webhook.enabled = enabled;
        }

        self.repo
            .update(&webhook)
            .await
            .map_err(|e| WebhookError::Internal(e.to_string()))?;
        Ok(webhook)
    }
}

pub struct DeleteWebhookUseCase {
    repo: Arc<dyn WebhookRepository>,
}

impl DeleteWebhookUseCase {
    pub fn new(repo: Arc<dyn WebhookRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, id: i64) -> Result<(), WebhookError> {
        let deleted = self
            .repo
            .delete(id)
            .await
            .map_err(|e| WebhookError::Internal(e.to_string()))?;
        if deleted {
            Ok(())
        } else {
            Err(WebhookError::NotFound(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::webhook_repository::MockWebhookRepository;
    use chrono::Utc;

    fn webhook(id: i64) -> Webhook {
        Webhook {
            id,
            url: "http://example.com/hook".to_string(),
            event_type: WebhookEventType::ProductCreated,
            enabled: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_rejects_non_http_url() {
        let mut repo = MockWebhookRepository::new();
        repo.expect_create().never();

        let uc = CreateWebhookUseCase::new(Arc::new(repo));
        let input = CreateWebhookInput {
            url: "ftp://example.com".to_string(),
            event_type: WebhookEventType::ProductCreated,
            enabled: true,
        };
        assert!(matches!(
            uc.execute(&input).await,
            Err(WebhookError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn create_success() {
        let mut repo = MockWebhookRepository::new();
        repo.expect_create().returning(|w| {
            Ok(Webhook {
                id: 1,
                url: w.url.clone(),
                event_type: w.event_type,
                enabled: w.enabled,
                created_at: Utc::now(),
            })
        });

        let uc = CreateWebhookUseCase::new(Arc::new(repo));
        let input = CreateWebhookInput {
            url: " https://example.com/hook ".to_string(),
            event_type: WebhookEventType::ProductDeleted,
            enabled: false,
        };
        let created = uc.execute(&input).await.unwrap();
        assert_eq!(created.url, "https://example.com/hook");
        assert!(!created.enabled);
    }

    #[tokio::test]
    async fn update_toggles_enabled_only() {
        let mut repo = MockWebhookRepository::new();
        repo.expect_find_by_id().returning(|id| Ok(Some(webhook(id))));
        repo.expect_update()
            .withf(|w| !w.enabled && w.url == "http://example.com/hook")
            .returning(|_| Ok(()));

        let uc = UpdateWebhookUseCase::new(Arc::new(repo));
        let input = UpdateWebhookInput {
            enabled: Some(false),
            ..Default::default()
        };
        let updated = uc.execute(3, &input).await.unwrap();
        assert_eq!(updated.event_type, WebhookEventType::ProductCreated);
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let mut repo = MockWebhookRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let uc = UpdateWebhookUseCase::new(Arc::new(repo));
        assert!(matches!(
            uc.execute(3, &UpdateWebhookInput::default()).await,
            Err(WebhookError::NotFound(3))
        ));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let mut repo = MockWebhookRepository::new();
        repo.expect_delete().returning(|_| Ok(false));

        let uc = DeleteWebhookUseCase::new(Arc::new(repo));
        assert!(matches!(
            uc.execute(8).await,
            Err(WebhookError::NotFound(8))
        ));
    }

    #[tokio::test]
    async fn list_returns_all() {
        let mut repo = MockWebhookRepository::new();
        repo.expect_find_all()
            .returning(|| Ok(vec![webhook(1), webhook(2)]));

        let uc = ListWebhooksUseCase::new(Arc::new(repo));
        assert_eq!(uc.execute().await.unwrap().len(), 2);
    }
}
