use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use watermarker_core::{CoreError, Result, WatermarkPosition};

pub const DEFAULT_FONT_FILE: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";

/// Rendering defaults, typically loaded from the environment by the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Where watermarked files land; falls back to the input's directory.
    pub output_dir: Option<PathBuf>,
    pub padding: u32,
    /// 6-digit hex, no leading '#'.
    pub font_color: String,
    pub border_color: String,
    pub border_thickness: u32,
    pub font_size: u32,
    /// ffmpeg -crf for videos.
    pub video_quality: u32,
    /// ffmpeg -q:v for images.
    pub image_quality: u32,
    pub font_file: PathBuf,
    /// Optional wall-clock ceiling per render attempt.
    pub timeout: Option<Duration>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            padding: 0,
            font_color: "FFC0CB".to_string(),
            border_color: "FFFFFF".to_string(),
            border_thickness: 2,
            font_size: 46,
            video_quality: 18,
            image_quality: 2,
            font_file: PathBuf::from(DEFAULT_FONT_FILE),
            timeout: None,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        let hex = Regex::new(r"^[0-9a-fA-F]{6}$").map_err(|e| CoreError::Internal(e.to_string()))?;
        if !hex.is_match(&self.font_color) {
            return Err(CoreError::Validation(format!(
                "Invalid font color '{}'. Must be a 6-digit hex code",
                self.font_color
            )));
        }
        if !hex.is_match(&self.border_color) {
            return Err(CoreError::Validation(format!(
                "Invalid border color '{}'. Must be a 6-digit hex code",
                self.border_color
            )));
        }
        Ok(())
    }

    /// Build a concrete render spec for one job from these defaults.
    pub fn spec(&self, text: impl Into<String>, position: WatermarkPosition) -> RenderSpec {
        RenderSpec {
            text: text.into(),
            position,
            tag: String::new(),
            padding: self.padding,
            font_color: self.font_color.clone(),
            border_color: self.border_color.clone(),
            border_thickness: self.border_thickness,
            font_size: self.font_size,
            video_quality: self.video_quality,
            image_quality: self.image_quality,
            font_file: self.font_file.clone(),
            output_dir: self.output_dir.clone(),
        }
    }
}

/// Everything one render invocation needs besides the input path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSpec {
    pub text: String,
    pub position: WatermarkPosition,
    /// Unique per-task tag mixed into output filenames so concurrent tasks
    /// never clobber each other.
    pub tag: String,
    pub padding: u32,
    pub font_color: String,
    pub border_color: String,
    pub border_thickness: u32,
    pub font_size: u32,
    pub video_quality: u32,
    pub image_quality: u32,
    pub font_file: PathBuf,
    pub output_dir: Option<PathBuf>,
}

impl RenderSpec {
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_font_file(mut self, font_file: PathBuf) -> Self {
        self.font_file = font_file;
        self
    }

    pub fn with_quality(mut self, quality: u32) -> Self {
        self.image_quality = quality;
        self.video_quality = quality;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }
}
