use async_trait::async_trait;

use crate::domain::entity::webhook::{NewWebhook, Webhook, WebhookEventType};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Webhook>>;
    async fn find_all(&self) -> anyhow::Result<Vec<Webhook>>;
    async fn find_enabled_by_event(
        &self,
        event_type: WebhookEventType,
    ) -> anyhow::Result<Vec<Webhook>>;
    async fn create(&self, webhook: &NewWebhook) -> anyhow::Result<Webhook>;
    async fn update(&self, webhook: &Webhook) -> anyhow::Result<()>;
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
}
