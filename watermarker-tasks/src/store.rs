use chrono::{DateTime, Utc};
use dashmap::DashMap;

use watermarker_core::{CoreError, FileOutcome, Result, Task, TaskId, TaskKind};

/// In-memory registry of task records for one process instance.
///
/// Backed by a sharded concurrent map: updates to different records never
/// block each other, updates to the same record are serialized on its entry.
/// Readers always get a consistent snapshot clone, never a half-written
/// record. Constructed explicitly and passed around; there is no ambient
/// singleton.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: DashMap<TaskId, Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new pending record and return a snapshot of it.
    pub fn create(&self, kind: TaskKind, max_retries: u32, files: Vec<FileOutcome>) -> Task {
        let task = Task::new(kind, max_retries, files);
        self.tasks.insert(task.id, task.clone());
        task
    }

    /// Snapshot of one record.
    pub fn get(&self, id: TaskId) -> Result<Task> {
        self.tasks
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CoreError::NotFound(format!("Task {} not found", id)))
    }

    /// Apply an atomic in-place mutation to exactly one record and return
    /// the resulting snapshot.
    pub fn update<F>(&self, id: TaskId, mutator: F) -> Result<Task>
    where
        F: FnOnce(&mut Task) -> Result<()>,
    {
        let mut entry = self
            .tasks
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("Task {} not found", id)))?;
        mutator(entry.value_mut())?;
        Ok(entry.value().clone())
    }

    /// Drop terminal records older than the cutoff, returning how many were
    /// removed. Driven by the server's periodic cleanup loop. Removals are
    /// counted inside the retain pass; diffing map lengths would race with
    /// concurrent `create` calls.
    pub fn remove_completed_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.tasks.retain(|_, task| {
            let expired = matches!(task.completed_at, Some(at) if at < cutoff);
            if expired {
                removed += 1;
            }
            !expired
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
