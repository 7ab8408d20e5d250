use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use http::{Request, Response};
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use crate::metrics::Metrics;

/// MetricsLayer は axum Router に適用する Tower Layer で、
/// HTTP リクエストのメトリクスを自動記録する。
///
/// パスラベルは `normalize_path` で正規化され、数値 ID や UUID は `:id` に置き換えられる。
///
/// # 使用例
///
/// ```ignore
/// use catalog_telemetry::MetricsLayer;
///
/// let app = Router::new()
///     .route("/api/v1/products", get(list_products))
///     .layer(MetricsLayer::new(metrics.clone()));
/// ```
#[derive(Clone)]
pub struct MetricsLayer {
    metrics: Arc<Metrics>,
}

impl MetricsLayer {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

/// MetricsService は MetricsLayer が生成する Tower Service。
#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    metrics: Arc<Metrics>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = MetricsResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let method = req.method().to_string();
        let path = normalize_path(req.uri().path());

        MetricsResponseFuture {
            inner: self.inner.call(req),
            method,
            path,
            start: Instant::now(),
            metrics: self.metrics.clone(),
        }
    }
}

pin_project! {
    /// MetricsResponseFuture はレスポンス完了を待ち、メトリクスを記録する Future。
    pub struct MetricsResponseFuture<F> {
        #[pin]
        inner: F,
        method: String,
        path: String,
        start: Instant,
        metrics: Arc<Metrics>,
    }
}

impl<F, ResBody, E> std::future::Future for MetricsResponseFuture<F>
where
    F: std::future::Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.inner.poll(cx) {
            Poll::Ready(Ok(response)) => {
                let elapsed = this.start.elapsed().as_secs_f64();
                let status = response.status();
                this.metrics
                    .record_http_request(this.method.as_str(), this.path.as_str(), status.as_str());
                this.metrics.record_http_duration(this.method.as_str(), this.path.as_str(), elapsed);
                tracing::debug!(
                    http.method = %this.method,
                    http.route = %this.path,
                    http.status_code = status.as_u16(),
                    elapsed_secs = elapsed,
                    "request completed"
                );
                Poll::Ready(Ok(response))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// normalize_path はメトリクスのラベル爆発を防ぐため、
/// 数値のみのセグメントと UUID 形式のセグメントを `:id` に置き換える。
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if is_identifier_segment(segment) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_identifier_segment(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        return true;
    }
    // UUID: 8-4-4-4-12 の 16 進数
    let parts: Vec<&str> = segment.split('-').collect();
    parts.len() == 5
        && [8, 4, 4, 4, 12]
            .iter()
            .zip(parts.iter())
            .all(|(len, part)| part.len() == *len && part.bytes().all(|b| b.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_numeric_segment() {
        assert_eq!(normalize_path("/api/v1/products/42"), "/api/v1/products/:id");
    }

    #[test]
    fn normalize_uuid_segment() {
        assert_eq!(
            normalize_path("/api/v1/upload/progress/0f8fad5b-d9cb-469f-a165-70867728950e"),
            "/api/v1/upload/progress/:id"
        );
    }

    #[test]
    fn keep_static_segments() {
        assert_eq!(normalize_path("/api/v1/products/bulk"), "/api/v1/products/bulk");
        assert_eq!(normalize_path("/healthz"), "/healthz");
    }

    #[tokio::test]
    async fn layer_records_request() {
        use tower::ServiceExt;

        let metrics = Arc::new(Metrics::new("test"));
        let svc = tower::service_fn(|_req: Request<()>| async {
            Ok::<_, std::convert::Infallible>(
                Response::builder()
                    .status(201)
                    .body(())
                    .expect("response"),
            )
        });
        let svc = MetricsLayer::new(metrics.clone()).layer(svc);

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/products/7")
            .body(())
            .expect("request");
        let resp = svc.oneshot(req).await.expect("call");
        assert_eq!(resp.status().as_u16(), 201);

        let text = metrics.gather_metrics();
        assert!(text.contains("http_requests_total"));
        assert!(text.contains("path=\"/api/v1/products/:id\""));
        assert!(text.contains("status=\"201\""));
    }
}
