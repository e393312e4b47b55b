use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use watermarker_core::TaskId;

fn default_position() -> String {
    "top-left".to_string()
}

fn default_text() -> String {
    "WATERMARK".to_string()
}

/// Style overrides shared by all submission endpoints; anything unset
/// falls back to the server's render defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StyleOverrides {
    pub font_file: Option<PathBuf>,
    pub font_size: Option<u32>,
    pub padding: Option<u32>,
    pub font_color: Option<String>,
    pub border_color: Option<String>,
    pub border_thickness: Option<u32>,
    pub quality: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct WatermarkRequest {
    /// Server-local path to the file to watermark.
    pub input: PathBuf,
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_position")]
    pub position: String,
    #[serde(flatten)]
    pub style: StyleOverrides,
}

#[derive(Debug, Deserialize)]
pub struct BatchWatermarkRequest {
    pub inputs: Vec<PathBuf>,
    pub text: String,
    #[serde(default = "default_position")]
    pub position: String,
    #[serde(flatten)]
    pub style: StyleOverrides,
}

/// Query parameters accompanying a multipart upload. Style fields are
/// spelled out because `serde_urlencoded` cannot flatten typed fields.
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_position")]
    pub position: String,
    pub font_file: Option<PathBuf>,
    pub font_size: Option<u32>,
    pub padding: Option<u32>,
    pub font_color: Option<String>,
    pub border_color: Option<String>,
    pub border_thickness: Option<u32>,
    pub quality: Option<u32>,
}

impl UploadParams {
    pub fn style(&self) -> StyleOverrides {
        StyleOverrides {
            font_file: self.font_file.clone(),
            font_size: self.font_size,
            padding: self.padding,
            font_color: self.font_color.clone(),
            border_color: self.border_color.clone(),
            border_thickness: self.border_thickness,
            quality: self.quality,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub task_id: TaskId,
    pub status: &'static str,
    pub status_url: String,
}

impl SubmitResponse {
    pub fn accepted(task_id: TaskId) -> Self {
        Self {
            task_id,
            status: "pending",
            status_url: format!("/api/v1/tasks/{task_id}"),
        }
    }
}
