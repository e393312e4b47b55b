use anyhow::Result;
use axum::{routing::get, Json, Router};
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use watermarker_render::{FfmpegEngine, RenderConfig};
use watermarker_tasks::TaskScheduler;

use crate::{routes, AppState};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);
const TASK_RETENTION_HOURS: i64 = 24;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_size: usize,
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            upload_dir: PathBuf::from("./uploads"),
            max_upload_size: 1024 * 1024 * 1024,
            api_key: None,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Serve the HTTP API until ctrl-c, then drain in-flight tasks.
pub async fn run(
    config: ApiConfig,
    scheduler: Arc<TaskScheduler>,
    ffmpeg: Arc<FfmpegEngine>,
    render: RenderConfig,
) -> Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let state = AppState {
        scheduler: Arc::clone(&scheduler),
        ffmpeg,
        render,
        upload_dir: config.upload_dir.clone(),
        max_upload_size: config.max_upload_size,
        api_key: config.api_key.clone(),
    };

    // Periodically drop old terminal records so the in-memory store does
    // not grow without bound.
    let store = scheduler.store();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let cutoff = Utc::now() - ChronoDuration::hours(TASK_RETENTION_HOURS);
            let removed = store.remove_completed_before(cutoff);
            if removed > 0 {
                tracing::info!(removed, "Cleaned up old tasks");
            }
        }
    });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(%addr, upload_dir = %config.upload_dir.display(), "Watermarker API listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    scheduler.shutdown().await;
    tracing::info!("All in-flight tasks drained");
    Ok(())
}
