pub mod client;
pub mod error;
pub mod payload;

pub use client::{HttpWebhookClient, WebhookClient, WebhookConfig};
pub use error::WebhookError;
pub use payload::WebhookPayload;

#[cfg(feature = "mock")]
pub use client::MockWebhookClient;
