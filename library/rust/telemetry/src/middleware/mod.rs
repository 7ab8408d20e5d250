//! HTTP サーバー向けのメトリクス記録ミドルウェア。
//!
//! ```ignore
//! use catalog_telemetry::metrics::Metrics;
//! use catalog_telemetry::MetricsLayer;
//!
//! let metrics = Arc::new(Metrics::new("catalog-server"));
//! let app = router(state)
//!     .layer(MetricsLayer::new(metrics))
//!     .layer(TraceLayer::new_for_http());
//! ```

#[cfg(any(feature = "axum-layer", test))]
mod http_layer;

#[cfg(any(feature = "axum-layer", test))]
pub use http_layer::{normalize_path, MetricsLayer};
