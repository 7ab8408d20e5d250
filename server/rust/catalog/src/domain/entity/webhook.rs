use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// WebhookEventType は購読可能な商品イベントの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
}

impl WebhookEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEventType::ProductCreated => "product_created",
            WebhookEventType::ProductUpdated => "product_updated",
            WebhookEventType::ProductDeleted => "product_deleted",
        }
    }
}

impl fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebhookEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product_created" => Ok(WebhookEventType::ProductCreated),
            "product_updated" => Ok(WebhookEventType::ProductUpdated),
            "product_deleted" => Ok(WebhookEventType::ProductDeleted),
            other => Err(format!("unknown webhook event type: {other}")),
        }
    }
}

/// Webhook は商品イベントの購読設定を表す。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: i64,
    pub url: String,
    pub event_type: WebhookEventType,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// NewWebhook は ID 採番前の購読設定。
#[derive(Debug, Clone, PartialEq)]
pub struct NewWebhook {
    pub url: String,
    pub event_type: WebhookEventType,
    pub enabled: bool,
}
