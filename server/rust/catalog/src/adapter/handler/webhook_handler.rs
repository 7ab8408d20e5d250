use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::adapter::handler::error::AppError;
use crate::adapter::handler::AppState;
use crate::domain::entity::{Webhook, WebhookEventType};
use crate::usecase::manage_webhooks::{CreateWebhookInput, UpdateWebhookInput};
use crate::usecase::test_webhook::TestWebhookOutput;

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWebhookRequest {
    #[validate(url(message = "url must be a valid URL"))]
    pub url: String,
    pub event_type: WebhookEventType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWebhookRequest {
    #[validate(url(message = "url must be a valid URL"))]
    pub url: Option<String>,
    pub event_type: Option<WebhookEventType>,
    pub enabled: Option<bool>,
}

pub async fn list_webhooks(State(state): State<AppState>) -> Result<Json<Vec<Webhook>>, AppError> {
    let webhooks = state.list_webhooks_uc.execute().await?;
    Ok(Json(webhooks))
}

pub async fn create_webhook(
    State(state): State<AppState>,
    Json(req): Json<CreateWebhookRequest>,
) -> Result<(StatusCode, Json<Webhook>), AppError> {
    req.validate()?;
    let input = CreateWebhookInput {
        url: req.url,
        event_type: req.event_type,
        enabled: req.enabled,
    };
    let webhook = state.create_webhook_uc.execute(&input).await?;
    Ok((StatusCode::CREATED, Json(webhook)))
}

pub async fn update_webhook(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateWebhookRequest>,
) -> Result<Json<Webhook>, AppError> {
    req.validate()?;
    let input = UpdateWebhookInput {
        url: req.url,
        event_type: req.event_type,
        enabled: req.enabled,
    };
    let webhook = state.update_webhook_uc.execute(id, &input).await?;
    Ok(Json(webhook))
}

pub async fn delete_webhook(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.delete_webhook_uc.execute(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// test_webhook は登録済み URL へテストイベントを送り、結果をそのまま返す。
/// 送信失敗もレスポンス本文で表現し、エラーステータスにはしない。
pub async fn test_webhook(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TestWebhookOutput>, AppError> {
    let output = state.test_webhook_uc.execute(id).await?;
    Ok(Json(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_rejects_malformed_url() {
        let req: CreateWebhookRequest =
            serde_json::from_str(r#"{"url":"not a url","event_type":"product_created"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_request_parses_event_type() {
        let req: CreateWebhookRequest = serde_json::from_str(
            r#"{"url":"https://example.com/hook","event_type":"product_deleted","enabled":false}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.event_type, WebhookEventType::ProductDeleted);
        assert!(!req.enabled);
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let parsed = serde_json::from_str::<CreateWebhookRequest>(
            r#"{"url":"https://example.com/hook","event_type":"order_created"}"#,
        );
        assert!(parsed.is_err());
    }
}
