use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use super::AppState;

pub async fn healthz() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// readyz はデータベースを使う構成では接続確認まで行う。
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let Some(pool) = state.db_pool.as_ref() else {
        return (StatusCode::OK, Json(json!({"status": "ready", "database": "in-memory"})));
    };

    match sqlx::query("SELECT 1").execute(pool.as_ref()).await {
        Ok(_) => (StatusCode::OK, Json(json!({"status": "ready", "database": "ok"}))),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "not_ready", "database": "unreachable"})),
            )
        }
    }
}
