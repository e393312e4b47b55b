use axum::{
    body::Bytes,
    extract::{Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use watermarker_core::{TaskKind, WatermarkPosition};
use watermarker_render::{filter, RenderEngine, RenderSpec};
use watermarker_tasks::WatermarkJob;

use crate::{
    dto::{BatchWatermarkRequest, StyleOverrides, SubmitResponse, UploadParams, WatermarkRequest},
    error::{ApiError, ApiResult},
    AppState,
};

fn build_spec(
    state: &AppState,
    text: &str,
    position: &str,
    style: &StyleOverrides,
) -> ApiResult<RenderSpec> {
    let position: WatermarkPosition = position.parse()?;
    let mut spec = state.render.spec(text, position);

    if let Some(font_file) = &style.font_file {
        if font_file.is_file() {
            spec = spec.with_font_file(font_file.clone());
        } else {
            tracing::warn!(
                font = %font_file.display(),
                default = %spec.font_file.display(),
                "Font file not found, using default"
            );
        }
    }
    if let Some(font_size) = style.font_size {
        spec.font_size = font_size;
    }
    if let Some(padding) = style.padding {
        spec.padding = padding;
    }
    if let Some(font_color) = &style.font_color {
        spec.font_color = font_color.clone();
    }
    if let Some(border_color) = &style.border_color {
        spec.border_color = border_color.clone();
    }
    if let Some(border_thickness) = style.border_thickness {
        spec.border_thickness = border_thickness;
    }
    if let Some(quality) = style.quality {
        spec = spec.with_quality(quality);
    }
    Ok(spec)
}

/// Watermark one server-local file. Returns 202 with the task id; callers
/// poll the status URL.
pub async fn submit(
    State(state): State<AppState>,
    Json(payload): Json<WatermarkRequest>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let spec = build_spec(&state, &payload.text, &payload.position, &payload.style)?;
    let task_id = state.scheduler.submit(WatermarkJob {
        kind: TaskKind::Single,
        inputs: vec![payload.input],
        spec,
    })?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse::accepted(task_id))))
}

/// Watermark a list of server-local files as one batch task.
pub async fn submit_batch(
    State(state): State<AppState>,
    Json(payload): Json<BatchWatermarkRequest>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let spec = build_spec(&state, &payload.text, &payload.position, &payload.style)?;
    let task_id = state.scheduler.submit(WatermarkJob {
        kind: TaskKind::Batch,
        inputs: payload.inputs,
        spec,
    })?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse::accepted(task_id))))
}

/// Pull the `file` field out of a multipart body, enforcing the size cap.
async fn read_upload(multipart: &mut Multipart, max_size: usize) -> ApiResult<(String, Bytes)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Missing filename".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::PayloadTooLarge(e.to_string()))?;
        if data.len() > max_size {
            return Err(ApiError::PayloadTooLarge(format!(
                "File exceeds {max_size} bytes"
            )));
        }
        return Ok((file_name, data));
    }
    Err(ApiError::BadRequest("No file field in upload".to_string()))
}

/// Persist uploaded bytes under a fresh name in the upload directory.
async fn save_upload(state: &AppState, file_name: &str, data: &Bytes) -> ApiResult<PathBuf> {
    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let destination = state
        .upload_dir
        .join(format!("{}.{extension}", Uuid::new_v4()));
    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    tokio::fs::write(&destination, data)
        .await
        .map_err(|e| ApiError::Internal(format!("Error saving file: {e}")))?;
    Ok(destination)
}

/// Upload a file and watermark it. The file lands in the upload directory
/// under a fresh name, then follows the same path as `submit`.
pub async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let spec = build_spec(&state, &params.text, &params.position, &params.style())?;

    let (file_name, data) = read_upload(&mut multipart, state.max_upload_size).await?;
    if !filter::is_supported(Path::new(&file_name)) {
        return Err(ApiError::Validation(format!(
            "Unsupported file type: {file_name}"
        )));
    }
    let input = save_upload(&state, &file_name, &data).await?;

    let task_id = state.scheduler.submit(WatermarkJob {
        kind: TaskKind::Single,
        inputs: vec![input],
        spec,
    })?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse::accepted(task_id))))
}

/// Upload a video and get back a watermarked frame from its midpoint,
/// rendered synchronously. Useful for previewing watermark settings
/// without committing to a full encode.
pub async fn video_sample(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let spec = build_spec(&state, &params.text, &params.position, &params.style())?;

    let (file_name, data) = read_upload(&mut multipart, state.max_upload_size).await?;
    let name = Path::new(&file_name);
    if !filter::is_supported(name) || filter::is_image(name) {
        return Err(ApiError::Validation(format!(
            "Expected a video file, got: {file_name}"
        )));
    }
    let input = save_upload(&state, &file_name, &data).await?;

    let result = render_sample(&state, &input, &spec).await;
    let _ = tokio::fs::remove_file(&input).await;
    let bytes = result?;

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}

async fn render_sample(state: &AppState, input: &Path, spec: &RenderSpec) -> ApiResult<Vec<u8>> {
    let duration = state.ffmpeg.probe_duration(input).await?;
    let frame = state.upload_dir.join(format!("{}.jpg", Uuid::new_v4()));

    let result = async {
        state
            .ffmpeg
            .extract_frame(input, duration / 2.0, &frame, state.render.image_quality)
            .await?;
        let output = state.ffmpeg.render(&frame, spec).await?;
        let bytes = tokio::fs::read(&output)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        let _ = tokio::fs::remove_file(&output).await;
        Ok(bytes)
    }
    .await;

    let _ = tokio::fs::remove_file(&frame).await;
    result
}
