pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use server::{run, ApiConfig};

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;

use watermarker_render::{FfmpegEngine, RenderConfig};
use watermarker_tasks::TaskScheduler;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<TaskScheduler>,
    /// Used directly by the synchronous video-sample path; everything else
    /// renders through the scheduler.
    pub ffmpeg: Arc<FfmpegEngine>,
    pub render: RenderConfig,
    pub upload_dir: PathBuf,
    pub max_upload_size: usize,
    pub api_key: Option<String>,
}

/// The `/api/v1` routes. Everything here sits behind the API-key gate;
/// `/health` lives outside in the server router.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/watermark", post(handlers::watermark::submit))
        .route(
            "/watermark/upload",
            post(handlers::watermark::upload)
                .layer(DefaultBodyLimit::max(state.max_upload_size)),
        )
        .route("/watermark/batch", post(handlers::watermark::submit_batch))
        .route(
            "/watermark/sample",
            post(handlers::watermark::video_sample)
                .layer(DefaultBodyLimit::max(state.max_upload_size)),
        )
        .route("/tasks/:id", get(handlers::tasks::get_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ))
        .with_state(state)
}
