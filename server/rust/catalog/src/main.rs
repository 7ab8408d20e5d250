use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use catalog_telemetry::metrics::Metrics;
use catalog_telemetry::{MetricsLayer, TelemetryConfig};
use catalog_webhook_client::{HttpWebhookClient, WebhookClient, WebhookConfig as ClientConfig};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use catalog_server::adapter::handler::{self, AppState};
use catalog_server::adapter::repository::{ProductPostgresRepository, WebhookPostgresRepository};
use catalog_server::domain::repository::{
    ImportProgressStore, ProductRepository, WebhookRepository,
};
use catalog_server::domain::service::{ImportJobScheduler, ProductEventNotifier};
use catalog_server::infrastructure::config::{Config, CorsConfig};
use catalog_server::infrastructure::database;
use catalog_server::infrastructure::import_scheduler::TokioImportScheduler;
use catalog_server::infrastructure::in_memory::{
    InMemoryImportProgressStore, InMemoryProductRepository, InMemoryWebhookRepository,
};
use catalog_server::infrastructure::progress_eviction::spawn_progress_eviction;
use catalog_server::infrastructure::webhook_dispatcher::WebhookDispatcher;
use catalog_server::usecase;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let telemetry_cfg = TelemetryConfig::from_env("catalog-server", env!("CARGO_PKG_VERSION"));
    catalog_telemetry::init_telemetry(&telemetry_cfg)
        .map_err(|e| anyhow::anyhow!("failed to init telemetry: {e}"))?;

    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config.yaml".to_string());
    let cfg = Config::load(&config_path)?;

    info!(
        app_name = %cfg.app.name,
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        "starting catalog server"
    );

    let metrics = Arc::new(Metrics::new("catalog-server"));

    // Repositories
    let db_pool = match cfg.database_url() {
        Some(url) => {
            let max_conns = cfg
                .database
                .as_ref()
                .map(|db| db.max_open_conns)
                .unwrap_or(25);
            let pool = Arc::new(database::connect(&url, max_conns).await?);
            database::ensure_schema(&pool).await?;
            info!("using PostgreSQL repositories");
            Some(pool)
        }
        None => {
            info!("no database configured, using in-memory repositories");
            None
        }
    };
    let product_repo: Arc<dyn ProductRepository> = match &db_pool {
        Some(pool) => Arc::new(ProductPostgresRepository::new(pool.clone())),
        None => Arc::new(InMemoryProductRepository::new()),
    };
    let webhook_repo: Arc<dyn WebhookRepository> = match &db_pool {
        Some(pool) => Arc::new(WebhookPostgresRepository::new(pool.clone())),
        None => Arc::new(InMemoryWebhookRepository::new()),
    };
    let progress_store: Arc<dyn ImportProgressStore> = Arc::new(InMemoryImportProgressStore::new());

    // Webhook delivery
    let delivery_client: Arc<dyn WebhookClient> = Arc::new(HttpWebhookClient::with_config(
        ClientConfig {
            timeout_ms: cfg.webhook.timeout_secs * 1000,
            max_retries: cfg.webhook.max_retries,
            ..ClientConfig::default()
        },
    )?);
    let test_client: Arc<dyn WebhookClient> = Arc::new(HttpWebhookClient::with_config(
        ClientConfig {
            timeout_ms: cfg.webhook.test_timeout_secs * 1000,
            ..ClientConfig::default()
        },
    )?);
    let notifier: Arc<dyn ProductEventNotifier> = Arc::new(WebhookDispatcher::new(
        webhook_repo.clone(),
        delivery_client,
        metrics.clone(),
    ));

    // Import pipeline
    let import_uc = Arc::new(
        usecase::ImportProductsUseCase::new(
            product_repo.clone(),
            progress_store.clone(),
            notifier.clone(),
        )
        .with_batch_size(cfg.import.batch_size)
        .with_webhook_notifications(cfg.import.notify_webhooks),
    );
    let scheduler: Arc<dyn ImportJobScheduler> = Arc::new(TokioImportScheduler::new(
        import_uc,
        cfg.import.max_concurrent_jobs,
        metrics.clone(),
    ));
    let _eviction = spawn_progress_eviction(
        progress_store.clone(),
        Duration::from_secs(cfg.import.job_retention_secs),
        Duration::from_secs(cfg.import.eviction_interval_secs),
    );

    let state = AppState {
        list_products_uc: Arc::new(usecase::ListProductsUseCase::new(product_repo.clone())),
        get_product_uc: Arc::new(usecase::GetProductUseCase::new(product_repo.clone())),
        create_product_uc: Arc::new(usecase::CreateProductUseCase::new(
            product_repo.clone(),
            notifier.clone(),
        )),
        update_product_uc: Arc::new(usecase::UpdateProductUseCase::new(
            product_repo.clone(),
            notifier.clone(),
        )),
        delete_product_uc: Arc::new(usecase::DeleteProductUseCase::new(
            product_repo.clone(),
            notifier.clone(),
        )),
        delete_all_products_uc: Arc::new(usecase::DeleteAllProductsUseCase::new(product_repo)),
        list_webhooks_uc: Arc::new(usecase::ListWebhooksUseCase::new(webhook_repo.clone())),
        create_webhook_uc: Arc::new(usecase::CreateWebhookUseCase::new(webhook_repo.clone())),
        update_webhook_uc: Arc::new(usecase::UpdateWebhookUseCase::new(webhook_repo.clone())),
        delete_webhook_uc: Arc::new(usecase::DeleteWebhookUseCase::new(webhook_repo.clone())),
        test_webhook_uc: Arc::new(usecase::TestWebhookUseCase::new(webhook_repo, test_client)),
        submit_import_uc: Arc::new(usecase::SubmitImportUseCase::new(
            progress_store.clone(),
            scheduler,
        )),
        get_import_progress_uc: Arc::new(usecase::GetImportProgressUseCase::new(
            progress_store.clone(),
        )),
        watch_import_progress_uc: Arc::new(
            usecase::WatchImportProgressUseCase::new(progress_store)
                .with_interval(Duration::from_millis(cfg.import.poll_interval_ms)),
        ),
        metrics: metrics.clone(),
        db_pool,
        upload_limit: cfg.import.max_upload_bytes,
    };

    let app = handler::router(state)
        .layer(MetricsLayer::new(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&cfg.cors));

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!("REST server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("catalog server stopped");
    Ok(())
}

/// cors_layer は許可オリジンに "*" が含まれていれば全オリジンを許可する。
fn cors_layer(cfg: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if cfg.allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = cfg
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = signal::ctrl_c() => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
