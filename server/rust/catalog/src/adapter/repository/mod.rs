pub mod product_postgres;
pub mod webhook_postgres;

pub use product_postgres::ProductPostgresRepository;
pub use webhook_postgres::WebhookPostgresRepository;
