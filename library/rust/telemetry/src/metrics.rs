use prometheus::core::Collector;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// リクエストレイテンシのバケット (秒)。
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Metrics はサービス単位の Prometheus レジストリと、カタログサーバーが記録する
/// カウンタ・ヒストグラムをまとめて保持する。
///
/// 生成や登録に失敗したコレクタは `None` になり、その記録は何もしない。
pub struct Metrics {
    registry: Registry,
    http_requests: Option<IntCounterVec>,
    http_latency: Option<HistogramVec>,
    import_jobs: Option<IntCounterVec>,
    import_rows: Option<IntCounterVec>,
    webhook_deliveries: Option<IntCounterVec>,
}

/// register はコレクタをレジストリへ登録し、成功したものだけを返す。
fn register<C>(registry: &Registry, collector: prometheus::Result<C>) -> Option<C>
where
    C: Collector + Clone + 'static,
{
    let collector = collector.ok()?;
    registry.register(Box::new(collector.clone())).ok()?;
    Some(collector)
}

impl Metrics {
    /// new は service ラベル付きのメトリクス一式を新しいレジストリ上に作る。
    pub fn new(service_name: &str) -> Self {
        let registry = Registry::new();
        let counter = |name: &str, help: &str, labels: &[&str]| {
            let opts = Opts::new(name, help).const_label("service", service_name);
            register(&registry, IntCounterVec::new(opts, labels))
        };

        let http_requests = counter(
            "http_requests_total",
            "Total number of HTTP requests",
            &["method", "path", "status"],
        );
        let import_jobs = counter(
            "import_jobs_total",
            "Total number of finished CSV import jobs",
            &["status"],
        );
        let import_rows = counter(
            "import_rows_total",
            "Total number of CSV rows handled by import jobs",
            &["action"],
        );
        let webhook_deliveries = counter(
            "webhook_deliveries_total",
            "Total number of outbound webhook deliveries",
            &["result"],
        );
        let http_latency = register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new(
                    "http_request_duration_seconds",
                    "Histogram of HTTP request latency",
                )
                .const_label("service", service_name)
                .buckets(LATENCY_BUCKETS.to_vec()),
                &["method", "path"],
            ),
        );

        Self {
            registry,
            http_requests,
            http_latency,
            import_jobs,
            import_rows,
            webhook_deliveries,
        }
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: &str) {
        if let Some(c) = &self.http_requests {
            c.with_label_values(&[method, path, status]).inc();
        }
    }

    pub fn record_http_duration(&self, method: &str, path: &str, duration_secs: f64) {
        if let Some(h) = &self.http_latency {
            h.with_label_values(&[method, path]).observe(duration_secs);
        }
    }

    /// record_import_job は終了したインポートジョブを最終ステータス
    /// ("complete" / "error") 別に数える。
    pub fn record_import_job(&self, status: &str) {
        if let Some(c) = &self.import_jobs {
            c.with_label_values(&[status]).inc();
        }
    }

    /// record_import_rows は "created" / "updated" / "skipped" 別に行数を加算する。
    pub fn record_import_rows(&self, action: &str, count: u64) {
        if let Some(c) = &self.import_rows {
            c.with_label_values(&[action]).inc_by(count);
        }
    }

    /// record_webhook_delivery は配信結果 ("delivered" / "rejected" / "failed") を数える。
    pub fn record_webhook_delivery(&self, result: &str) {
        if let Some(c) = &self.webhook_deliveries {
            c.with_label_values(&[result]).inc();
        }
    }

    /// gather_metrics はレジストリの内容を Prometheus テキスト形式で返す。
    pub fn gather_metrics(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
