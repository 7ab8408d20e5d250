pub mod import_progress_store;
pub mod product_repository;
pub mod webhook_repository;

pub use import_progress_store::ImportProgressStore;
pub use product_repository::{DuplicateSku, ProductImportSession, ProductRepository};
pub use webhook_repository::WebhookRepository;
