use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::WebhookError;
use crate::payload::WebhookPayload;

/// べき等性キーのヘッダー名。リトライ間で同じ値を送る。
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// 送信設定。
/// 商品イベントは fire-and-forget で送るため、デフォルトではリトライしない。
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            max_retries: 0,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
        }
    }
}

impl WebhookConfig {
    fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// backoff は retry 回目 (1 始まり) の待機時間を返す。
    /// 初期値から倍々に伸ばして max_backoff_ms で頭打ちにし、最大で半分のジッターを足す。
    fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        let base = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        let jitter = rand::thread_rng().gen_range(0..=base / 2);
        Duration::from_millis(base + jitter)
    }
}

/// WebhookClient は購読先 URL へペイロードを POST し、応答ステータスを返す。
/// 2xx 以外の応答も Ok で返し、成否の判断は呼び出し側に委ねる。
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait WebhookClient: Send + Sync {
    async fn send(&self, url: &str, payload: &WebhookPayload) -> Result<u16, WebhookError>;
}

/// 429 と 5xx は受信側の一時的な失敗とみなす。
fn is_transient(status: u16) -> bool {
    status == 429 || status >= 500
}

/// reqwest を使った WebhookClient 実装。
pub struct HttpWebhookClient {
    config: WebhookConfig,
    http: reqwest::Client,
}

impl HttpWebhookClient {
    /// with_config は設定済みのタイムアウトを持つクライアントを生成する。
    pub fn with_config(config: WebhookConfig) -> Result<Self, WebhookError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| WebhookError::ClientBuild(e.to_string()))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    async fn post(&self, url: &str, body: &[u8], key: &str) -> Result<u16, reqwest::Error> {
        let resp = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(IDEMPOTENCY_KEY_HEADER, key)
            .body(body.to_vec())
            .send()
            .await?;
        Ok(resp.status().as_u16())
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    async fn send(&self, url: &str, payload: &WebhookPayload) -> Result<u16, WebhookError> {
        let body = serde_json::to_vec(payload)?;
        let key = Uuid::new_v4().to_string();
        let attempts = self.config.max_attempts();
        let mut last_status = 0;

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.config.backoff(attempt - 1)).await;
            }
            debug!(url, attempt, event_type = %payload.event_type, "sending webhook");

            match self.post(url, &body, &key).await {
                Ok(status) if is_transient(status) => {
                    warn!(url, attempt, attempts, status, "webhook receiver answered with transient error");
                    last_status = status;
                }
                Ok(status) => return Ok(status),
                Err(e) if attempt == attempts => {
                    return Err(if e.is_timeout() {
                        WebhookError::Timeout
                    } else {
                        WebhookError::RequestFailed(e.to_string())
                    });
                }
                Err(e) => {
                    warn!(url, attempt, attempts, error = %e, "webhook request failed");
                }
            }
        }

        Err(WebhookError::MaxRetriesExceeded {
            attempts,
            last_status_code: last_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header_exists, method};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn created_event() -> WebhookPayload {
        WebhookPayload::for_product(
            "product_created",
            "2026-01-01T00:00:00Z",
            json!({"id": 1, "sku": "A1", "name": "Widget", "description": null, "active": true}),
        )
    }

    fn client(timeout_ms: u64, max_retries: u32) -> HttpWebhookClient {
        HttpWebhookClient::with_config(WebhookConfig {
            timeout_ms,
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
        })
        .unwrap()
    }

    /// 受信したリクエストのべき等性キーを記録し、status_for(n) の応答を返すモック。
    async fn scripted_receiver(
        status_for: impl Fn(usize) -> u16 + Send + Sync + 'static,
    ) -> (MockServer, Arc<Mutex<Vec<String>>>) {
        let server = MockServer::start().await;
        let keys = Arc::new(Mutex::new(Vec::new()));
        let seen = keys.clone();
        Mock::given(method("POST"))
            .respond_with(move |req: &Request| {
                let mut seen = seen.lock().unwrap();
                let key = req
                    .headers
                    .get(IDEMPOTENCY_KEY_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                seen.push(key);
                ResponseTemplate::new(status_for(seen.len()))
            })
            .mount(&server)
            .await;
        (server, keys)
    }

    #[tokio::test]
    async fn posts_json_payload_with_idempotency_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists(IDEMPOTENCY_KEY_HEADER))
            .and(body_partial_json(
                json!({"event_type": "product_created", "product": {"sku": "A1"}}),
            ))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let status = client(2000, 0).send(&server.uri(), &created_event()).await.unwrap();
        assert_eq!(status, 204);
    }

    #[tokio::test]
    async fn default_config_sends_once() {
        let (server, keys) = scripted_receiver(|_| 500).await;
        let client = HttpWebhookClient::with_config(WebhookConfig::default()).unwrap();

        let err = client.send(&server.uri(), &created_event()).await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(keys.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transient_errors_are_retried_with_same_key() {
        let (server, keys) = scripted_receiver(|n| if n < 3 { 503 } else { 200 }).await;

        let status = client(2000, 3).send(&server.uri(), &created_event()).await.unwrap();
        assert_eq!(status, 200);

        let keys = keys.lock().unwrap();
        assert_eq!(keys.len(), 3);
        assert!(keys.iter().all(|k| k == &keys[0]));
        assert!(Uuid::parse_str(&keys[0]).is_ok());
    }

    #[tokio::test]
    async fn client_errors_are_returned_without_retry() {
        let (server, keys) = scripted_receiver(|_| 404).await;

        let status = client(2000, 3).send(&server.uri(), &created_event()).await.unwrap();
        assert_eq!(status, 404);
        assert_eq!(keys.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let (server, _) = scripted_receiver(|_| 429).await;

        match client(2000, 2).send(&server.uri(), &created_event()).await {
            Err(WebhookError::MaxRetriesExceeded {
                attempts,
                last_status_code,
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last_status_code, 429);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_receiver_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let err = client(50, 0).send(&server.uri(), &created_event()).await.unwrap_err();
        assert!(matches!(err, WebhookError::Timeout));
        assert_eq!(err.status_code(), None);
    }

    #[tokio::test]
    async fn unreachable_receiver_fails() {
        let err = client(500, 0)
            .send("http://127.0.0.1:1/hook", &created_event())
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::RequestFailed(_)));
    }

    #[test]
    fn transient_statuses() {
        for status in [429, 500, 502, 503] {
            assert!(is_transient(status), "{status}");
        }
        for status in [200, 201, 400, 404, 410] {
            assert!(!is_transient(status), "{status}");
        }
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let config = WebhookConfig {
            initial_backoff_ms: 100,
            max_backoff_ms: 500,
            ..WebhookConfig::default()
        };
        let first = config.backoff(1).as_millis();
        assert!((100..=150).contains(&first));
        let second = config.backoff(2).as_millis();
        assert!((200..=300).contains(&second));
        let capped = config.backoff(30).as_millis();
        assert!((500..=750).contains(&capped));
    }
}
