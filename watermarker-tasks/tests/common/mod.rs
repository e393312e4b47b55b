use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use watermarker_core::{CoreError, Result, WatermarkPosition};
use watermarker_render::{RenderConfig, RenderEngine, RenderSpec};

/// Deterministic output path used by the scripted engine.
pub fn output_for(input: &Path) -> PathBuf {
    PathBuf::from(format!("{}.watermarked", input.display()))
}

pub fn spec(text: &str) -> RenderSpec {
    RenderConfig::default().spec(text, WatermarkPosition::BottomRight)
}

/// Rendering collaborator double: fails the first N calls per input path,
/// then succeeds. `u32::MAX` means always fail.
pub struct ScriptedEngine {
    failures: HashMap<PathBuf, u32>,
    calls: Mutex<HashMap<PathBuf, u32>>,
    total_calls: AtomicU32,
}

impl ScriptedEngine {
    pub fn new(failures: HashMap<PathBuf, u32>) -> Self {
        Self {
            failures,
            calls: Mutex::new(HashMap::new()),
            total_calls: AtomicU32::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(HashMap::new())
    }

    pub fn failing_first(input: &str, times: u32) -> Self {
        Self::new(HashMap::from([(PathBuf::from(input), times)]))
    }

    pub fn always_failing(input: &str) -> Self {
        Self::failing_first(input, u32::MAX)
    }

    pub fn total_calls(&self) -> u32 {
        self.total_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderEngine for ScriptedEngine {
    async fn render(&self, input: &Path, _spec: &RenderSpec) -> Result<PathBuf> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let entry = calls.entry(input.to_path_buf()).or_insert(0);
            *entry += 1;
            *entry
        };
        let planned = self.failures.get(input).copied().unwrap_or(0);
        if call <= planned {
            return Err(CoreError::Render(format!(
                "scripted failure {call} for {}",
                input.display()
            )));
        }
        Ok(output_for(input))
    }
}
