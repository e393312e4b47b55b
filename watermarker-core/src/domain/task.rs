use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CoreError, Result};
use crate::domain::ids::TaskId;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Single,
    Batch,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Per-file outcome inside a batch, in submission order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub state: FileState,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum FileState {
    Pending,
    Succeeded { output: PathBuf },
    Failed { reason: String },
}

impl FileOutcome {
    pub fn pending(input: PathBuf) -> Self {
        Self {
            input,
            state: FileState::Pending,
        }
    }
}

/// Success payload: the watermarked output paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskOutput {
    pub outputs: Vec<PathBuf>,
}

/// State container for one watermarking job.
///
/// Written by exactly one runner at a time; read by any number of status
/// pollers through snapshot clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Serialized as `task_id` to match the wire schema that hook
    /// receivers and status pollers consume.
    #[serde(rename = "task_id")]
    pub id: TaskId,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// 0-100, monotone non-decreasing within an attempt.
    pub progress: u8,
    pub result: Option<TaskOutput>,
    pub error: Option<String>,
    /// Attempts made beyond the first.
    pub retry_count: u32,
    pub max_retries: u32,
    pub files: Vec<FileOutcome>,
}

impl Task {
    pub fn new(kind: TaskKind, max_retries: u32, files: Vec<FileOutcome>) -> Self {
        Self {
            id: TaskId::new(),
            kind,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            progress: 0,
            result: None,
            error: None,
            retry_count: 0,
            max_retries,
            files,
        }
    }

    fn ensure_not_terminal(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(CoreError::InvalidState(format!(
                "Task {} is already {:?}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// `pending -> processing`: records the start timestamp.
    pub fn mark_processing(&mut self) -> Result<()> {
        self.ensure_not_terminal()?;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.status = TaskStatus::Processing;
        Ok(())
    }

    /// `processing -> completed`: terminal success.
    pub fn mark_completed(&mut self, output: TaskOutput) -> Result<()> {
        self.ensure_not_terminal()?;
        self.status = TaskStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.progress = 100;
        self.result = Some(output);
        self.error = None;
        Ok(())
    }

    /// `processing -> failed`: terminal failure after retries exhausted.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<()> {
        self.ensure_not_terminal()?;
        self.status = TaskStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.result = None;
        self.error = Some(reason.into());
        Ok(())
    }

    /// Progress is clamped to 100 and never moves backwards; retries keep
    /// the last known value rather than resetting to zero.
    pub fn advance_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
    }

    /// Count one more attempt against the retry budget.
    pub fn record_retry(&mut self) -> Result<()> {
        if self.retry_count >= self.max_retries {
            return Err(CoreError::RetryBudgetExceeded {
                attempts: self.retry_count + 1,
                last_error: self.error.clone().unwrap_or_default(),
            });
        }
        self.retry_count += 1;
        Ok(())
    }

    pub fn remaining_retries(&self) -> u32 {
        self.max_retries.saturating_sub(self.retry_count)
    }
}
