use serde::{Deserialize, Serialize};

/// WebhookPayload は購読先へ POST する JSON ボディ。
/// 商品イベントでは `product` を、疎通テストでは `test` を設定する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event_type: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<bool>,
}

impl WebhookPayload {
    /// for_product は商品イベント用のペイロードを生成する。
    pub fn for_product(
        event_type: impl Into<String>,
        timestamp: impl Into<String>,
        product: serde_json::Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: timestamp.into(),
            product: Some(product),
            test: None,
        }
    }

    /// test_event は疎通テスト用のペイロードを生成する。
    pub fn test_event(event_type: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: timestamp.into(),
            product: None,
            test: Some(true),
        }
    }
}
