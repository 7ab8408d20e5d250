use std::convert::Infallible;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderName, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::StreamExt;
use serde_json::json;

use crate::adapter::handler::error::AppError;
use crate::adapter::handler::AppState;
use crate::adapter::presenter::response::UploadResponse;
use crate::domain::entity::ImportProgress;
use crate::usecase::submit_import::SubmitImportInput;
use crate::usecase::watch_import_progress::ProgressEvent;

const FILE_FIELD: &str = "file";

/// upload_csv は multipart の file フィールドを受け取り、インポートジョブを開始して即座に 202 を返す。
pub async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request("SVC_CATALOG_INVALID_UPLOAD", &e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request("SVC_CATALOG_INVALID_UPLOAD", &e.body_text()))?;
        upload = Some(SubmitImportInput { filename, content });
        break;
    }

    let input = upload.ok_or_else(|| {
        AppError::bad_request("SVC_CATALOG_INVALID_FILE", "File must be a CSV file")
    })?;
    let output = state.submit_import_uc.execute(input).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            job_id: output.job_id,
            message: "File upload started".to_string(),
        }),
    ))
}

/// get_import_job は進捗を 1 回だけ返す。未知のジョブは 404。
pub async fn get_import_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ImportProgress>, AppError> {
    let progress = state.get_import_progress_uc.execute(&job_id).await?;
    Ok(Json(progress))
}

fn to_event(event: ProgressEvent) -> Result<Event, Infallible> {
    let data = match event {
        ProgressEvent::Snapshot(progress) => serde_json::to_string(&progress)
            .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string()),
        ProgressEvent::NotFound => json!({ "error": "Job not found" }).to_string(),
    };
    Ok(Event::default().data(data))
}

/// stream_progress は終了状態か未知のジョブを観測するまで、進捗を Server-Sent Events で送り続ける。
/// クライアントが切断するとストリームは破棄され、ポーリングも止まる。
pub async fn stream_progress(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let stream = state.watch_import_progress_uc.execute(job_id).map(to_event);
    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    )
}
