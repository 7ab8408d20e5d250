pub mod error;
pub mod health;
pub mod product_handler;
pub mod upload_handler;
pub mod webhook_handler;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::PgPool;

use crate::usecase::{
    CreateProductUseCase, CreateWebhookUseCase, DeleteAllProductsUseCase, DeleteProductUseCase,
    DeleteWebhookUseCase, GetImportProgressUseCase, GetProductUseCase, ListProductsUseCase,
    ListWebhooksUseCase, SubmitImportUseCase, TestWebhookUseCase, UpdateProductUseCase,
    UpdateWebhookUseCase, WatchImportProgressUseCase,
};

/// アップロード本文の既定上限 (100 MiB)。
pub const DEFAULT_UPLOAD_LIMIT: usize = 100 * 1024 * 1024;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub list_products_uc: Arc<ListProductsUseCase>,
    pub get_product_uc: Arc<GetProductUseCase>,
    pub create_product_uc: Arc<CreateProductUseCase>,
    pub update_product_uc: Arc<UpdateProductUseCase>,
    pub delete_product_uc: Arc<DeleteProductUseCase>,
    pub delete_all_products_uc: Arc<DeleteAllProductsUseCase>,
    pub list_webhooks_uc: Arc<ListWebhooksUseCase>,
    pub create_webhook_uc: Arc<CreateWebhookUseCase>,
    pub update_webhook_uc: Arc<UpdateWebhookUseCase>,
    pub delete_webhook_uc: Arc<DeleteWebhookUseCase>,
    pub test_webhook_uc: Arc<TestWebhookUseCase>,
    pub submit_import_uc: Arc<SubmitImportUseCase>,
    pub get_import_progress_uc: Arc<GetImportProgressUseCase>,
    pub watch_import_progress_uc: Arc<WatchImportProgressUseCase>,
    pub metrics: Arc<catalog_telemetry::metrics::Metrics>,
    pub db_pool: Option<Arc<PgPool>>,
    pub upload_limit: usize,
}

/// Build the REST API router.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(metrics_handler));

    let api_routes = Router::new()
        // Products
        .route(
            "/api/v1/products",
            get(product_handler::list_products).post(product_handler::create_product),
        )
        .route(
            "/api/v1/products/bulk",
            delete(product_handler::delete_all_products),
        )
        .route(
            "/api/v1/products/{id}",
            get(product_handler::get_product)
                .put(product_handler::update_product)
                .delete(product_handler::delete_product),
        )
        // Webhooks
        .route(
            "/api/v1/webhooks",
            get(webhook_handler::list_webhooks).post(webhook_handler::create_webhook),
        )
        .route(
            "/api/v1/webhooks/{id}",
            put(webhook_handler::update_webhook).delete(webhook_handler::delete_webhook),
        )
        .route(
            "/api/v1/webhooks/{id}/test",
            post(webhook_handler::test_webhook),
        )
        // Import
        .route(
            "/api/v1/upload",
            post(upload_handler::upload_csv).layer(DefaultBodyLimit::max(state.upload_limit)),
        )
        .route(
            "/api/v1/upload/progress/{job_id}",
            get(upload_handler::stream_progress),
        )
        .route(
            "/api/v1/upload/jobs/{job_id}",
            get(upload_handler::get_import_job),
        );

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .with_state(state)
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.metrics.gather_metrics();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
