//! Pure helpers for building ffmpeg drawtext invocations.

use std::path::{Path, PathBuf};

use watermarker_core::WatermarkPosition;

use crate::config::RenderSpec;

pub const VALID_EXTENSIONS: [&str; 11] = [
    "jpg", "jpeg", "png", "bmp", "gif", "tiff", "mp4", "mkv", "mov", "avi", "webm",
];
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "tiff"];

pub const OUTPUT_SUFFIX: &str = "_watermarked";

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

pub fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|ext| VALID_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_image(path: &Path) -> bool {
    extension(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Escape text for an ffmpeg drawtext filter: backslash, quote and colon
/// are significant inside the filter graph.
pub fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "'\\\\''")
        .replace(':', "\\\\:")
}

/// drawtext x/y expressions for an anchor position. Uses ffmpeg's own
/// `w`/`h`/`text_w`/`text_h` variables so no probing is needed.
pub fn position_expressions(position: WatermarkPosition, padding: u32) -> (String, String) {
    match position {
        WatermarkPosition::TopLeft => (padding.to_string(), padding.to_string()),
        WatermarkPosition::TopRight => (format!("w-text_w-{padding}"), padding.to_string()),
        WatermarkPosition::BottomLeft => (padding.to_string(), format!("h-text_h-{padding}")),
        WatermarkPosition::BottomRight => {
            (format!("w-text_w-{padding}"), format!("h-text_h-{padding}"))
        }
        WatermarkPosition::Center => ("(w-text_w)/2".to_string(), "(h-text_h)/2".to_string()),
    }
}

/// The full `-vf` argument for one render.
pub fn drawtext_filter(spec: &RenderSpec) -> String {
    let (x, y) = position_expressions(spec.position, spec.padding);
    let text = escape_drawtext(&spec.text);
    let font_file = spec.font_file.to_string_lossy().replace('\\', "/");

    format!(
        "drawtext=fontfile='{font_file}':text='{text}':x={x}:y={y}:fontsize={size}:\
         fontcolor=0x{font_color}:borderw={border_w}:bordercolor=0x{border_color}:\
         shadowcolor=0x808080:shadowx=3:shadowy=3",
        size = spec.font_size,
        font_color = spec.font_color,
        border_w = spec.border_thickness,
        border_color = spec.border_color,
    )
}

/// Collision-free output path: task tag plus original stem, under the
/// configured output directory or the input's own directory.
pub fn output_path(input: &Path, spec: &RenderSpec) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let ext = extension(input).unwrap_or_else(|| "out".to_string());

    let file_name = if spec.tag.is_empty() {
        format!("{stem}{OUTPUT_SUFFIX}.{ext}")
    } else {
        format!("{stem}{OUTPUT_SUFFIX}_{}.{ext}", spec.tag)
    };

    let dir = spec
        .output_dir
        .clone()
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(file_name)
}
