//! HTTP surface for mediascribe.
//!
//! This module exposes a compact Axum router over the pipeline service:
//!
//! - `POST /image-caption` – Caption a single uploaded image.
//! - `POST /process-video` – Turn an uploaded video into a frame-by-frame description.
//! - `POST /upload` – Extract text from a document batch and append it to the corpus.
//! - `GET /files` / `DELETE /files/:filename` – Inspect and prune the session file list.
//! - `POST /ask` – Answer a question against the accumulated corpus.
//! - `GET /metrics` – Observe pipeline counters.
//!
//! The handlers are thin: multipart plumbing and response shaping live here, every
//! decision lives in the pipeline.

use crate::config::get_config;
use crate::pipeline::{AnswerError, DocumentError, PipelineApi, PipelineError, UploadedFile};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path as UrlPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

/// Largest accepted upload body; videos dominate, so this is generous.
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Build the HTTP router exposing the media pipeline.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PipelineApi + 'static,
{
    Router::new()
        .route("/image-caption", post(caption_image::<S>))
        .route("/process-video", post(process_video::<S>))
        .route("/upload", post(upload_documents::<S>))
        .route("/files", get(list_files::<S>))
        .route("/files/:filename", delete(remove_file::<S>))
        .route("/ask", post(ask_question::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

/// Success response for `POST /image-caption`.
#[derive(Serialize)]
struct CaptionResponse {
    /// Generated caption for the uploaded image.
    caption: String,
}

/// Caption a single image from the `image` multipart field.
async fn caption_image<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<CaptionResponse>, ApiError>
where
    S: PipelineApi,
{
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        if field.name() != Some("image") {
            continue;
        }
        let bytes = field.bytes().await.map_err(bad_request)?;
        let caption = service.caption_image(&bytes).await?;
        return Ok(Json(CaptionResponse { caption }));
    }

    Err(ApiError::message(
        StatusCode::BAD_REQUEST,
        "Missing 'image' field",
    ))
}

/// Success response for `POST /process-video`.
#[derive(Serialize)]
struct DescriptionResponse {
    /// Frame-by-frame description of the uploaded video.
    description: String,
}

/// Analyze a video from the `video` multipart field.
///
/// The upload is staged to disk for the frame decoder and removed again on every exit
/// path; uploads are transient inputs, not persisted state.
async fn process_video<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<DescriptionResponse>, ApiError>
where
    S: PipelineApi,
{
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        if field.name() != Some("video") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("video").to_string();
        let bytes = field.bytes().await.map_err(bad_request)?;
        let path = store_upload(&file_name, &bytes)?;

        let outcome = service.analyze_video(&path).await;
        discard_upload(&path);
        let description = outcome?;
        return Ok(Json(DescriptionResponse { description }));
    }

    Err(ApiError::message(
        StatusCode::BAD_REQUEST,
        "Missing 'video' field",
    ))
}

/// Success response for `POST /upload`.
#[derive(Serialize)]
struct UploadResponse {
    message: &'static str,
    /// File names committed to the session, in upload order.
    files: Vec<String>,
}

/// Ingest a batch of documents from repeated `files` multipart fields.
async fn upload_documents<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError>
where
    S: PipelineApi,
{
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        if field.name() != Some("files") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let declared = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(bad_request)?;
        let mime_type = declared.unwrap_or_else(|| {
            mime_guess::from_path(&file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });
        let path = store_upload(&file_name, &bytes)?;
        uploads.push(UploadedFile {
            path,
            file_name,
            mime_type,
        });
    }

    if uploads.is_empty() {
        return Err(ApiError::message(
            StatusCode::BAD_REQUEST,
            "No files provided",
        ));
    }

    let outcome = service.ingest_documents(&uploads).await;
    for upload in &uploads {
        discard_upload(&upload.path);
    }
    let delta = outcome?;

    Ok(Json(UploadResponse {
        message: "Files uploaded successfully",
        files: delta.files,
    }))
}

/// Response body for `GET /files`.
#[derive(Serialize)]
struct FilesResponse {
    files: Vec<String>,
}

/// List uploaded file names known to the session.
async fn list_files<S>(State(service): State<Arc<S>>) -> Json<FilesResponse>
where
    S: PipelineApi,
{
    Json(FilesResponse {
        files: service.list_files().await,
    })
}

/// Forget an uploaded file name.
async fn remove_file<S>(
    State(service): State<Arc<S>>,
    UrlPath(filename): UrlPath<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
    S: PipelineApi,
{
    if service.remove_file(&filename).await {
        Ok(Json(json!({ "message": "File removed successfully" })))
    } else {
        Err(ApiError::message(StatusCode::NOT_FOUND, "File not found"))
    }
}

/// Request body for `POST /ask`.
#[derive(Deserialize)]
struct AskRequest {
    /// Natural-language question to answer against the corpus.
    question: String,
}

/// Success response for `POST /ask`.
#[derive(Serialize)]
struct AskResponse {
    /// Extracted answer span.
    answer: String,
}

/// Answer a question against the accumulated corpus.
async fn ask_question<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError>
where
    S: PipelineApi,
{
    let answer = service.answer_question(&request.question).await?;
    Ok(Json(AskResponse { answer }))
}

/// Return the current pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: PipelineApi,
{
    Json(service.metrics_snapshot())
}

/// Stage an upload under the configured upload directory with a collision-free name.
fn store_upload(file_name: &str, bytes: &[u8]) -> Result<PathBuf, ApiError> {
    let dir = &get_config().upload_dir;
    std::fs::create_dir_all(dir).map_err(|err| {
        tracing::error!(error = %err, "Failed to create upload directory");
        ApiError::message(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store upload")
    })?;

    // Only the final path component of the client-supplied name is trusted.
    let safe_name = std::path::Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload");
    let path = dir.join(format!("{}-{}", uuid::Uuid::new_v4(), safe_name));
    std::fs::write(&path, bytes).map_err(|err| {
        tracing::error!(error = %err, "Failed to write upload");
        ApiError::message(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store upload")
    })?;
    Ok(path)
}

/// Best-effort removal of a staged upload.
fn discard_upload(path: &std::path::Path) {
    if let Err(err) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %err, "Failed to remove staged upload");
    }
}

fn bad_request(error: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::message(StatusCode::BAD_REQUEST, &error.to_string())
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn message(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(error: PipelineError) -> Self {
        let status = match &error {
            PipelineError::Answer(AnswerError::NoContextAvailable) => StatusCode::BAD_REQUEST,
            PipelineError::Document(DocumentError::UnsupportedFileType(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // QA failures stay generic; upstream internals never reach the caller.
        let message = match &error {
            PipelineError::Answer(AnswerError::NoContextAvailable) => "No data uploaded".to_string(),
            PipelineError::Answer(_) => "Failed to get answer from the model".to_string(),
            other => other.to_string(),
        };
        Self { status, message }
    }
}
