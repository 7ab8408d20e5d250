use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::entity::webhook::{NewWebhook, Webhook, WebhookEventType};
use crate::domain::repository::WebhookRepository;

pub struct WebhookPostgresRepository {
    pool: Arc<PgPool>,
}

impl WebhookPostgresRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct WebhookRow {
    id: i64,
    url: String,
    event_type: String,
    enabled: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<WebhookRow> for Webhook {
    type Error = anyhow::Error;

    fn try_from(r: WebhookRow) -> Result<Self, Self::Error> {
        Ok(Webhook {
            id: r.id,
            url: r.url,
            event_type: r.event_type.parse().map_err(anyhow::Error::msg)?,
            enabled: r.enabled,
            created_at: r.created_at,
        })
    }
}

fn into_webhooks(rows: Vec<WebhookRow>) -> anyhow::Result<Vec<Webhook>> {
    rows.into_iter().map(Webhook::try_from).collect()
}

#[async_trait]
impl WebhookRepository for WebhookPostgresRepository {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Webhook>> {
        let row: Option<WebhookRow> = sqlx::query_as(
            "SELECT id, url, event_type, enabled, created_at FROM webhooks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;
        row.map(Webhook::try_from).transpose()
    }

    async fn find_all(&self) -> anyhow::Result<Vec<Webhook>> {
        let rows: Vec<WebhookRow> = sqlx::query_as(
            "SELECT id, url, event_type, enabled, created_at FROM webhooks ORDER BY id",
        )
        .fetch_all(self.pool.as_ref())
        .await?;
        into_webhooks(rows)
    }

    async fn find_enabled_by_event(
        &self,
        event_type: WebhookEventType,
    ) -> anyhow::Result<Vec<Webhook>> {
        let rows: Vec<WebhookRow> = sqlx::query_as(
            "SELECT id, url, event_type, enabled, created_at FROM webhooks \
             WHERE event_type = $1 AND enabled ORDER BY id",
        )
        .bind(event_type.as_str())
        .fetch_all(self.pool.as_ref())
        .await?;
        into_webhooks(rows)
    }

    async fn create(&self, webhook: &NewWebhook) -> anyhow::Result<Webhook> {
        let row: WebhookRow = sqlx::query_as(
            "INSERT INTO webhooks (url, event_type, enabled, created_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, url, event_type, enabled, created_at",
        )
        .bind(&webhook.url)
        .bind(webhook.event_type.as_str())
        .bind(webhook.enabled)
        .bind(Utc::now())
        .fetch_one(self.pool.as_ref())
        .await?;
        row.try_into()
    }

    async fn update(&self, webhook: &Webhook) -> anyhow::Result<()> {
        sqlx::query("UPDATE webhooks SET url = $2, event_type = $3, enabled = $4 WHERE id = $1")
            .bind(webhook.id)
            .bind(&webhook.url)
            .bind(webhook.event_type.as_str())
            .bind(webhook.enabled)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM webhooks WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(event_type: &str) -> WebhookRow {
        WebhookRow {
            id: 1,
            url: "https://example.com/hook".to_string(),
            event_type: event_type.to_string(),
            enabled: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn row_with_known_event_type_converts() {
        let webhook = Webhook::try_from(row("product_updated")).unwrap();
        assert_eq!(webhook.event_type, WebhookEventType::ProductUpdated);
    }

    #[test]
    fn row_with_unknown_event_type_is_rejected() {
        assert!(Webhook::try_from(row("order_created")).is_err());
    }
}
