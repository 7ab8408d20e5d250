use std::sync::Arc;

use catalog_telemetry::metrics::Metrics;
use catalog_webhook_client::{WebhookClient, WebhookPayload};
use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::domain::entity::product::Product;
use crate::domain::entity::webhook::WebhookEventType;
use crate::domain::repository::WebhookRepository;
use crate::domain::service::ProductEventNotifier;

/// WebhookDispatcher は商品イベントを購読中の Webhook へ非同期に配信する。
/// 配信は tokio タスクで行い、失敗はログとメトリクスにのみ記録する。
pub struct WebhookDispatcher {
    repo: Arc<dyn WebhookRepository>,
    client: Arc<dyn WebhookClient>,
    metrics: Arc<Metrics>,
}

impl WebhookDispatcher {
    pub fn new(
        repo: Arc<dyn WebhookRepository>,
        client: Arc<dyn WebhookClient>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            repo,
            client,
            metrics,
        }
    }

    async fn deliver(
        repo: Arc<dyn WebhookRepository>,
        client: Arc<dyn WebhookClient>,
        metrics: Arc<Metrics>,
        event_type: WebhookEventType,
        payload: WebhookPayload,
    ) {
        let webhooks = match repo.find_enabled_by_event(event_type).await {
            Ok(webhooks) => webhooks,
            Err(e) => {
                warn!(event_type = %event_type, error = %e, "failed to load webhook subscribers");
                return;
            }
        };
        if webhooks.is_empty() {
            return;
        }

        let sends = webhooks.iter().map(|webhook| {
            let client = client.clone();
            let payload = &payload;
            async move { client.send(&webhook.url, payload).await }
        });
        let results = join_all(sends).await;

        for (webhook, result) in webhooks.iter().zip(results) {
            match result {
                Ok(status) if (200..300).contains(&status) => {
                    metrics.record_webhook_delivery("delivered");
                    debug!(webhook_id = webhook.id, status, "webhook delivered");
                }
                Ok(status) => {
                    metrics.record_webhook_delivery("rejected");
                    warn!(
                        webhook_id = webhook.id,
                        url = %webhook.url,
                        status,
                        "webhook receiver rejected event"
                    );
                }
                Err(e) => {
                    metrics.record_webhook_delivery("failed");
                    warn!(
                        webhook_id = webhook.id,
                        url = %webhook.url,
                        error = %e,
                        "webhook delivery failed"
                    );
                }
            }
        }
    }
}

impl ProductEventNotifier for WebhookDispatcher {
    fn notify(&self, event_type: WebhookEventType, product: &Product) {
        let payload = WebhookPayload::for_product(
            event_type.as_str(),
            Utc::now().to_rfc3339(),
            product.public_fields(),
        );

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(event_type = %event_type, "no async runtime; webhook notification dropped");
            return;
        };
        handle.spawn(Self::deliver(
            self.repo.clone(),
            self.client.clone(),
            self.metrics.clone(),
            event_type,
            payload,
        ));
    }
}
