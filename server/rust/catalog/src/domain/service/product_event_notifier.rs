use crate::domain::entity::product::Product;
use crate::domain::entity::webhook::WebhookEventType;

/// ProductEventNotifier は商品の変更を購読者へ通知する。
/// notify は配信を待たずに戻り、配信結果を呼び出し元へ返さない。
#[cfg_attr(test, mockall::automock)]
pub trait ProductEventNotifier: Send + Sync {
    fn notify(&self, event_type: WebhookEventType, product: &Product);
}

/// NoopProductEventNotifier は通知を行わない実装。
pub struct NoopProductEventNotifier;

impl ProductEventNotifier for NoopProductEventNotifier {
    fn notify(&self, _event_type: WebhookEventType, _product: &Product) {}
}
