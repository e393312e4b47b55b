//! ffmpeg-backed implementation of [`RenderEngine`].

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use watermarker_core::{CoreError, Result};

use crate::config::RenderSpec;
use crate::filter::{drawtext_filter, is_image, is_supported, output_path};
use crate::RenderEngine;

#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    timeout: Option<Duration>,
}

impl FfmpegEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ceiling on total wall-clock time per render attempt; expiry surfaces
    /// as a render error and counts against the retry budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Check that ffmpeg is on the PATH before accepting work.
    pub async fn verify() -> Result<()> {
        let status = Command::new("ffmpeg")
            .arg("-version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
            .map_err(|_| {
                CoreError::Render(
                    "FFmpeg executable not found. Install FFmpeg and ensure it is in your PATH"
                        .to_string(),
                )
            })?;
        if !status.success() {
            return Err(CoreError::Render("ffmpeg -version failed".to_string()));
        }
        Ok(())
    }

    async fn run(&self, mut command: Command) -> Result<Output> {
        let fut = command.output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                CoreError::Render(format!("ffmpeg timed out after {:?}", limit))
            })?,
            None => fut.await,
        }
        .map_err(|e| CoreError::Render(format!("Failed to spawn ffmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .last()
                .unwrap_or("Unknown ffmpeg error")
                .to_string();
            return Err(CoreError::Render(format!("ffmpeg error: {detail}")));
        }
        Ok(output)
    }

    /// Duration of a video file in seconds, via ffprobe.
    pub async fn probe_duration(&self, input: &Path) -> Result<f64> {
        let mut command = Command::new("ffprobe");
        command
            .args(["-v", "error"])
            .args(["-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(input);

        let output = self.run(command).await?;
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse::<f64>()
            .map_err(|e| CoreError::Render(format!("Could not parse duration for {}: {e}", input.display())))
    }

    /// Grab a single frame at `at_secs` into a jpg next to `frame_path`,
    /// falling back to the first frame when seeking fails.
    pub async fn extract_frame(
        &self,
        input: &Path,
        at_secs: f64,
        frame_path: &Path,
        quality: u32,
    ) -> Result<()> {
        let mut command = Command::new("ffmpeg");
        command
            .args(["-ss", &at_secs.to_string()])
            .arg("-i")
            .arg(input)
            .args(["-frames:v", "1"])
            .args(["-q:v", &quality.to_string()])
            .arg("-y")
            .arg(frame_path);

        if let Err(err) = self.run(command).await {
            tracing::warn!(input = %input.display(), %err, "Frame grab failed, using first frame");
            let mut fallback = Command::new("ffmpeg");
            fallback
                .arg("-i")
                .arg(input)
                .args(["-frames:v", "1"])
                .args(["-q:v", &quality.to_string()])
                .arg("-y")
                .arg(frame_path);
            self.run(fallback).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RenderEngine for FfmpegEngine {
    async fn render(&self, input: &Path, spec: &RenderSpec) -> Result<PathBuf> {
        if !input.is_file() {
            return Err(CoreError::Render(format!("File not found: {}", input.display())));
        }
        if !is_supported(input) {
            return Err(CoreError::Render(format!(
                "Unsupported file type: {}",
                input.display()
            )));
        }

        let output = output_path(input, spec);
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::Render(format!("Could not create {}: {e}", parent.display())))?;
        }

        let mut command = Command::new("ffmpeg");
        command
            .arg("-i")
            .arg(input)
            .args(["-vf", &drawtext_filter(spec)]);

        if is_image(input) {
            command.args(["-q:v", &spec.image_quality.to_string()]);
        } else {
            command
                .args(["-crf", &spec.video_quality.to_string()])
                .args(["-c:a", "copy"]);
        }
        command.arg("-y").arg(&output);

        tracing::debug!(input = %input.display(), output = %output.display(), "Rendering watermark");
        self.run(command).await?;

        if !output.is_file() {
            return Err(CoreError::Render(format!(
                "Failed to create output file: {}",
                output.display()
            )));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use watermarker_core::WatermarkPosition;

    #[tokio::test]
    async fn missing_input_is_a_render_error() {
        let engine = FfmpegEngine::new();
        let spec = RenderConfig::default().spec("x", WatermarkPosition::Center);
        let err = engine
            .render(Path::new("/nonexistent/file.jpg"), &spec)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Render(_)));
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let engine = FfmpegEngine::new();
        let spec = RenderConfig::default().spec("x", WatermarkPosition::Center);
        let err = engine.render(&path, &spec).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));
    }
}
