pub mod config;
pub mod ffmpeg;
pub mod filter;

pub use config::*;
pub use ffmpeg::*;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use watermarker_core::Result;

/// External rendering collaborator: burns text onto one media file.
///
/// Implementations must be safe to call again with the same arguments, so
/// the task runner can retry a failed attempt.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    async fn render(&self, input: &Path, spec: &RenderSpec) -> Result<PathBuf>;
}
