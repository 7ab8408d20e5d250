use std::sync::Arc;
use std::time::Instant;

use catalog_webhook_client::{WebhookClient, WebhookError as DeliveryError, WebhookPayload};
use chrono::Utc;
use serde::Serialize;

use crate::domain::repository::WebhookRepository;
use crate::usecase::manage_webhooks::WebhookError;

/// TestWebhookOutput は疎通テストの結果。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestWebhookOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// TestWebhookUseCase は登録済み Webhook にテストイベントを送信し、応答を報告する。
/// client にはテスト用のタイムアウトを設定したクライアントを渡す。
pub struct TestWebhookUseCase {
    repo: Arc<dyn WebhookRepository>,
    client: Arc<dyn WebhookClient>,
}

impl TestWebhookUseCase {
    pub fn new(repo: Arc<dyn WebhookRepository>, client: Arc<dyn WebhookClient>) -> Self {
        Self { repo, client }
    }

    pub async fn execute(&self, id: i64) -> Result<TestWebhookOutput, WebhookError> {
        let webhook = self
            .repo
            .find_by_id(id)
            .await
            .map_err(|e| WebhookError::Internal(e.to_string()))?
            .ok_or(WebhookError::NotFound(id))?;

        let payload =
            WebhookPayload::test_event(webhook.event_type.as_str(), Utc::now().to_rfc3339());

        let started = Instant::now();
        let result = self.client.send(&webhook.url, &payload).await;
        let elapsed_ms = (started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0;

        let output = match result {
            Ok(status) => TestWebhookOutput {
                success: (200..300).contains(&status),
                status_code: Some(status),
                response_time_ms: Some(elapsed_ms),
                error: None,
            },
            Err(DeliveryError::Timeout) => TestWebhookOutput {
                success: false,
                status_code: None,
                response_time_ms: None,
                error: Some("Request timeout".to_string()),
            },
            Err(e) => TestWebhookOutput {
                success: false,
                status_code: e.status_code(),
                response_time_ms: Some(elapsed_ms),
                error: Some(e.to_string()),
            },
        };

        tracing::info!(
            webhook_id = id,
            success = output.success,
            status_code = output.status_code,
            "webhook test delivered"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::webhook::{Webhook, WebhookEventType};
    use crate::domain::repository::webhook_repository::MockWebhookRepository;
    use catalog_webhook_client::MockWebhookClient;

    fn repo_with_hook() -> MockWebhookRepository {
        let mut repo = MockWebhookRepository::new();
        repo.expect_find_by_id().returning(|id| {
            Ok(Some(Webhook {
                id,
                url: "http://receiver.local/hook".to_string(),
                event_type: WebhookEventType::ProductUpdated,
                enabled: true,
                created_at: Utc::now(),
            }))
        });
        repo
    }

    #[tokio::test]
    async fn sends_test_payload_and_reports_2xx() {
        let mut client = MockWebhookClient::new();
        client
            .expect_send()
            .withf(|url, payload| {
                url == "http://receiver.local/hook"
                    && payload.event_type == "product_updated"
                    && payload.test == Some(true)
                    && payload.product.is_none()
            })
            .returning(|_, _| Ok(204));

        let uc = TestWebhookUseCase::new(Arc::new(repo_with_hook()), Arc::new(client));
        let out = uc.execute(1).await.unwrap();
        assert!(out.success);
        assert_eq!(out.status_code, Some(204));
        assert!(out.response_time_ms.is_some());
        assert!(out.error.is_none());
    }

    #[tokio::test]
    async fn non_2xx_is_not_success() {
        let mut client = MockWebhookClient::new();
        client.expect_send().returning(|_, _| Ok(404));

        let uc = TestWebhookUseCase::new(Arc::new(repo_with_hook()), Arc::new(client));
        let out = uc.execute(1).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.status_code, Some(404));
    }

    #[tokio::test]
    async fn timeout_reports_request_timeout() {
        let mut client = MockWebhookClient::new();
        client
            .expect_send()
            .returning(|_, _| Err(DeliveryError::Timeout));

        let uc = TestWebhookUseCase::new(Arc::new(repo_with_hook()), Arc::new(client));
        let out = uc.execute(1).await.unwrap();
        assert_eq!(
            out,
            TestWebhookOutput {
                success: false,
                status_code: None,
                response_time_ms: None,
                error: Some("Request timeout".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn unknown_webhook_is_not_found() {
        let mut repo = MockWebhookRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let uc = TestWebhookUseCase::new(Arc::new(repo), Arc::new(MockWebhookClient::new()));
        assert!(matches!(uc.execute(4).await, Err(WebhookError::NotFound(4))));
    }
}
