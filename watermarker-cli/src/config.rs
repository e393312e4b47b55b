//! Process configuration: `WATERMARKER_*` environment variables layered
//! over an optional config file, mirroring the service's deployment model.

use anyhow::Result;
use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use watermarker_api::ApiConfig;
use watermarker_render::{RenderConfig, DEFAULT_FONT_FILE};
use watermarker_tasks::{HookConfig, HookTarget, RetryPolicy, SchedulerConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Server
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_size_mb: usize,
    pub api_key: Option<String>,

    // Rendering
    pub output_dir: Option<PathBuf>,
    pub padding: u32,
    pub font_color: String,
    pub border_color: String,
    pub border_thickness: u32,
    pub font_size: u32,
    pub video_quality: u32,
    pub image_quality: u32,
    pub font_file: PathBuf,
    pub render_timeout_secs: Option<u64>,

    // Task processing
    pub workers: usize,
    pub max_retries: u32,
    pub retry_delay_secs: u64,

    // Lifecycle hooks
    pub start_hook: Option<String>,
    pub error_hook: Option<String>,
    pub complete_hook: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            upload_dir: PathBuf::from("./uploads"),
            max_upload_size_mb: 1024,
            api_key: None,
            output_dir: None,
            padding: 0,
            font_color: "FFC0CB".to_string(),
            border_color: "FFFFFF".to_string(),
            border_thickness: 2,
            font_size: 46,
            video_quality: 18,
            image_quality: 2,
            font_file: PathBuf::from(DEFAULT_FONT_FILE),
            render_timeout_secs: None,
            workers: 4,
            max_retries: 3,
            retry_delay_secs: 5,
            start_hook: None,
            error_hook: None,
            complete_hook: None,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("WATERMARKER"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            output_dir: self.output_dir.clone(),
            padding: self.padding,
            font_color: self.font_color.clone(),
            border_color: self.border_color.clone(),
            border_thickness: self.border_thickness,
            font_size: self.font_size,
            video_quality: self.video_quality,
            image_quality: self.image_quality,
            font_file: self.font_file.clone(),
            timeout: self.render_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            workers: self.workers,
            retry: RetryPolicy {
                max_retries: self.max_retries,
                initial_delay: Duration::from_secs(self.retry_delay_secs),
                ..RetryPolicy::default()
            },
        }
    }

    pub fn hook_config(&self) -> HookConfig {
        HookConfig {
            on_start: self.start_hook.as_deref().map(HookTarget::parse),
            on_error: self.error_hook.as_deref().map(HookTarget::parse),
            on_completion: self.complete_hook.as_deref().map(HookTarget::parse),
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            host: self.host.clone(),
            port: self.port,
            upload_dir: self.upload_dir.clone(),
            max_upload_size: self.max_upload_size_mb * 1024 * 1024,
            api_key: self.api_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_the_documented_render_settings() {
        let settings = Settings::default();
        let render = settings.render_config();
        render.validate().unwrap();
        assert_eq!(render.font_color, "FFC0CB");
        assert_eq!(render.video_quality, 18);
        assert_eq!(render.image_quality, 2);
        assert_eq!(settings.max_retries, 3);
    }

    #[test]
    fn hook_strings_parse_into_targets() {
        let settings = Settings {
            start_hook: Some("https://example.com/start".to_string()),
            complete_hook: Some("/usr/local/bin/notify".to_string()),
            ..Default::default()
        };
        let hooks = settings.hook_config();
        assert!(matches!(hooks.on_start, Some(HookTarget::Http(_))));
        assert!(matches!(hooks.on_completion, Some(HookTarget::Command(_))));
        assert!(hooks.on_error.is_none());
    }
}
