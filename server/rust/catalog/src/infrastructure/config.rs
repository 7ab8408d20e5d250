use serde::Deserialize;

use crate::usecase::import_products::MAX_BATCH_SIZE;

/// Application configuration for catalog server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// 未設定の場合はインメモリリポジトリで起動する。
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(content)?;
        cfg.import.validate()?;
        Ok(cfg)
    }

    /// database_url は接続先 URL を返す。環境変数 DATABASE_URL が設定ファイルより優先される。
    pub fn database_url(&self) -> Option<String> {
        std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .or_else(|| self.database.as_ref().map(DatabaseConfig::connection_url))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// DatabaseConfig はデータベース接続の設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
    #[serde(default = "default_max_open_conns")]
    pub max_open_conns: u32,
}

fn default_db_port() -> u16 {
    5432
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

fn default_max_open_conns() -> u32 {
    25
}

impl DatabaseConfig {
    /// PostgreSQL 接続 URL を生成する。
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, self.host, self.port, self.name, self.ssl_mode
        )
    }
}

/// ImportConfig は CSV 一括インポートの設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// 終了済みジョブの進捗を保持する秒数。
    #[serde(default = "default_job_retention_secs")]
    pub job_retention_secs: u64,
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// true の場合、インポートで作成・更新した商品も Webhook で通知する。
    #[serde(default)]
    pub notify_webhooks: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            poll_interval_ms: default_poll_interval_ms(),
            job_retention_secs: default_job_retention_secs(),
            eviction_interval_secs: default_eviction_interval_secs(),
            max_upload_bytes: default_max_upload_bytes(),
            notify_webhooks: false,
        }
    }
}

impl ImportConfig {
    fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            anyhow::bail!(
                "import.batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            );
        }
        Ok(())
    }
}

fn default_batch_size() -> usize {
    1000
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_job_retention_secs() -> u64 {
    3600
}

fn default_eviction_interval_secs() -> u64 {
    60
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

/// WebhookConfig は Webhook 配信の設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_delivery_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_test_timeout_secs")]
    pub test_timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_delivery_timeout_secs(),
            test_timeout_secs: default_test_timeout_secs(),
            max_retries: 0,
        }
    }
}

fn default_delivery_timeout_secs() -> u64 {
    5
}

fn default_test_timeout_secs() -> u64 {
    10
}

/// CorsConfig は許可するオリジンを表す。"*" を含む場合は全オリジンを許可する。
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = Config::from_yaml("app:\n  name: catalog-server\n").unwrap();
        assert_eq!(cfg.server.port, 8000);
        assert!(cfg.database.is_none());
        assert_eq!(cfg.import.batch_size, 1000);
        assert_eq!(cfg.import.max_concurrent_jobs, 4);
        assert_eq!(cfg.import.poll_interval_ms, 500);
        assert_eq!(cfg.import.job_retention_secs, 3600);
        assert!(!cfg.import.notify_webhooks);
        assert_eq!(cfg.webhook.timeout_secs, 5);
        assert_eq!(cfg.webhook.test_timeout_secs, 10);
        assert_eq!(cfg.cors.allowed_origins, vec!["*".to_string()]);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
app:
  name: catalog-server
  environment: staging
server:
  port: 9000
database:
  host: db
  name: catalog
  user: app
  password: secret
import:
  batch_size: 500
  notify_webhooks: true
cors:
  allowed_origins: ["http://localhost:3000"]
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.environment, "staging");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.import.batch_size, 500);
        assert_eq!(cfg.import.eviction_interval_secs, 60);
        assert!(cfg.import.notify_webhooks);
        assert_eq!(
            cfg.database.unwrap().connection_url(),
            "postgres://app:secret@db:5432/catalog?sslmode=disable"
        );
    }

    #[test]
    fn test_batch_size_out_of_range_is_error() {
        for size in [0, MAX_BATCH_SIZE + 1] {
            let yaml = format!("app:\n  name: catalog-server\nimport:\n  batch_size: {size}\n");
            let err = Config::from_yaml(&yaml).unwrap_err();
            assert!(err.to_string().contains("import.batch_size"), "{err}");
        }
        let yaml = format!("app:\n  name: catalog-server\nimport:\n  batch_size: {MAX_BATCH_SIZE}\n");
        assert_eq!(Config::from_yaml(&yaml).unwrap().import.batch_size, MAX_BATCH_SIZE);
    }

    #[test]
    fn test_missing_app_section_is_error() {
        assert!(Config::from_yaml("server:\n  port: 1\n").is_err());
    }
}
