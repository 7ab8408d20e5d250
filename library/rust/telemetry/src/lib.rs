pub mod metrics;
pub mod middleware;

#[cfg(any(feature = "axum-layer", test))]
pub use middleware::MetricsLayer;


use tracing_subscriber::{
    fmt, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// TelemetryConfig は telemetry ライブラリの初期化設定を保持する。
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub version: String,
    pub environment: String,
    /// EnvFilter 形式のフィルタ文字列（例: "info", "catalog_server=debug,info"）。
    pub log_level: String,
    /// ログ出力フォーマット。"text" の場合はプレーンテキスト、それ以外は JSON。
    pub log_format: String,
}

impl TelemetryConfig {
    /// from_env は環境変数から TelemetryConfig を生成する。
    /// RUST_LOG が設定されていればそれをフィルタとして優先する。
    pub fn from_env(service_name: &str, version: &str) -> Self {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let log_level = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| default_log_level(&environment).to_string());
        Self {
            service_name: service_name.to_string(),
            version: version.to_string(),
            environment,
            log_level,
            log_format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
        }
    }
}

/// default_log_level は環境名に応じたデフォルトのログレベルを返す。
///
/// - dev: debug
/// - staging: info
/// - それ以外: warn
pub fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "dev" => "debug",
        "staging" => "info",
        _ => "warn",
    }
}

/// init_telemetry は tracing-subscriber を初期化する。
/// グローバル subscriber が既に設定済みの場合はエラーを返す。
pub fn init_telemetry(cfg: &TelemetryConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_new(&cfg.log_level)?;
    let registry = tracing_subscriber::registry().with(filter);

    if cfg.log_format == "text" {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);
        registry.with(fmt_layer).try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);
        registry.with(fmt_layer).try_init()?;
    }

    tracing::info!(
        service = %cfg.service_name,
        version = %cfg.version,
        environment = %cfg.environment,
        "telemetry initialized"
    );
    Ok(())
}
