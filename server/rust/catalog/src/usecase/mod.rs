pub mod create_product;
pub mod delete_product;
pub mod get_import_progress;
pub mod get_product;
pub mod import_products;
pub mod list_products;
pub mod manage_webhooks;
pub mod submit_import;
pub mod test_webhook;
pub mod update_product;
pub mod watch_import_progress;

pub use create_product::CreateProductUseCase;
pub use delete_product::{DeleteAllProductsUseCase, DeleteProductUseCase};
pub use get_import_progress::GetImportProgressUseCase;
pub use get_product::GetProductUseCase;
pub use import_products::ImportProductsUseCase;
pub use list_products::ListProductsUseCase;
pub use manage_webhooks::{
    CreateWebhookUseCase, DeleteWebhookUseCase, ListWebhooksUseCase, UpdateWebhookUseCase,
};
pub use submit_import::SubmitImportUseCase;
pub use test_webhook::TestWebhookUseCase;
pub use update_product::UpdateProductUseCase;
pub use watch_import_progress::WatchImportProgressUseCase;
