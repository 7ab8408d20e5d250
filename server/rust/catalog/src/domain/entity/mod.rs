pub mod import_progress;
pub mod product;
pub mod webhook;

pub use import_progress::{ImportProgress, ImportStatus};
pub use product::{NewProduct, Product, ProductFilter};
pub use webhook::{NewWebhook, Webhook, WebhookEventType};
