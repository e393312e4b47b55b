//! Best-effort lifecycle notifications: webhook URLs or local commands.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tokio::task::JoinHandle;

use watermarker_core::{CoreError, Result, Task};

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    Start,
    Error,
    Completion,
}

impl HookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::Start => "start",
            HookEvent::Error => "error",
            HookEvent::Completion => "complete",
        }
    }
}

/// Where a hook delivers: an HTTP endpoint or a local executable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HookTarget {
    Http(String),
    Command(PathBuf),
}

impl HookTarget {
    /// `http(s)://` strings are webhooks, anything else is a command path.
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            HookTarget::Http(value.to_string())
        } else {
            HookTarget::Command(PathBuf::from(value))
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HookConfig {
    pub on_start: Option<HookTarget>,
    pub on_error: Option<HookTarget>,
    pub on_completion: Option<HookTarget>,
}

/// Dispatches task snapshots to configured hook targets.
///
/// Delivery is fire-and-forget: one attempt per event per transition,
/// failures are logged and swallowed, and the task's own state is never
/// affected.
#[derive(Debug, Clone)]
pub struct HookDispatcher {
    config: HookConfig,
    client: reqwest::Client,
}

impl HookDispatcher {
    pub fn new(config: HookConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    pub fn disabled() -> Self {
        Self::new(HookConfig::default())
    }

    fn target(&self, event: HookEvent) -> Option<&HookTarget> {
        match event {
            HookEvent::Start => self.config.on_start.as_ref(),
            HookEvent::Error => self.config.on_error.as_ref(),
            HookEvent::Completion => self.config.on_completion.as_ref(),
        }
    }

    /// Deliver a snapshot of the task for `event` in the background. The
    /// returned handle is internal bookkeeping only; callers are free to
    /// drop it.
    pub fn fire(&self, event: HookEvent, task: &Task) -> Option<JoinHandle<()>> {
        let target = self.target(event)?.clone();
        let client = self.client.clone();
        let task_id = task.id;
        let snapshot = task.clone();

        Some(tokio::spawn(async move {
            if let Err(err) = deliver(&client, &target, &snapshot).await {
                tracing::warn!(
                    %task_id,
                    event = event.as_str(),
                    %err,
                    "Hook delivery failed"
                );
            } else {
                tracing::debug!(%task_id, event = event.as_str(), "Hook delivered");
            }
        }))
    }
}

async fn deliver(client: &reqwest::Client, target: &HookTarget, task: &Task) -> Result<()> {
    let payload = serde_json::to_value(task)?;
    match target {
        HookTarget::Http(url) => {
            let response = client
                .post(url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| CoreError::HookDelivery(e.to_string()))?;
            response
                .error_for_status()
                .map_err(|e| CoreError::HookDelivery(e.to_string()))?;
        }
        HookTarget::Command(path) => {
            let status = Command::new(path)
                .arg(payload.to_string())
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status()
                .await
                .map_err(|e| CoreError::HookDelivery(format!("{}: {e}", path.display())))?;
            if !status.success() {
                return Err(CoreError::HookDelivery(format!(
                    "{} exited with {status}",
                    path.display()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_strings_become_http_targets() {
        assert_eq!(
            HookTarget::parse("https://example.com/hook"),
            HookTarget::Http("https://example.com/hook".to_string())
        );
        assert_eq!(
            HookTarget::parse("http://localhost:9000/x"),
            HookTarget::Http("http://localhost:9000/x".to_string())
        );
    }

    #[test]
    fn other_strings_become_command_targets() {
        assert_eq!(
            HookTarget::parse("/usr/local/bin/notify"),
            HookTarget::Command(PathBuf::from("/usr/local/bin/notify"))
        );
    }
}
