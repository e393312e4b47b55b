//! Submission seam shared by the CLI and the HTTP layer.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

use watermarker_core::{CoreError, FileOutcome, Result, Task, TaskId, TaskKind};
use watermarker_render::{RenderEngine, RenderSpec};

use crate::hooks::HookDispatcher;
use crate::retry::RetryPolicy;
use crate::runner::{RenderRequest, TaskRunner};
use crate::store::TaskStore;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Bound on concurrently rendering workers.
    pub workers: usize,
    pub retry: RetryPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            retry: RetryPolicy::default(),
        }
    }
}

/// One watermarking request as submitted by a caller.
#[derive(Debug, Clone)]
pub struct WatermarkJob {
    pub kind: TaskKind,
    pub inputs: Vec<PathBuf>,
    pub spec: RenderSpec,
}

/// Creates task records and hands them to a bounded worker pool.
///
/// Submission never blocks on pool availability: the record sits `pending`
/// until a worker slot frees. Callers observe progress only by polling
/// [`TaskScheduler::status`].
pub struct TaskScheduler {
    store: Arc<TaskStore>,
    runner: Arc<TaskRunner>,
    max_retries: u32,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl TaskScheduler {
    pub fn new(
        config: SchedulerConfig,
        engine: Arc<dyn RenderEngine>,
        hooks: HookDispatcher,
    ) -> Self {
        let store = Arc::new(TaskStore::new());
        let runner = Arc::new(TaskRunner::new(
            Arc::clone(&store),
            engine,
            Arc::new(hooks),
            config.retry.clone(),
        ));
        Self {
            store,
            runner,
            max_retries: config.retry.max_retries,
            permits: Arc::new(Semaphore::new(config.workers.max(1))),
            tracker: TaskTracker::new(),
        }
    }

    pub fn store(&self) -> Arc<TaskStore> {
        Arc::clone(&self.store)
    }

    /// Validate the job, create its record, and schedule it. Returns the
    /// task id immediately; never waits for completion.
    pub fn submit(&self, job: WatermarkJob) -> Result<TaskId> {
        if job.inputs.is_empty() {
            return Err(CoreError::Validation("No input files provided".to_string()));
        }
        if job.spec.text.trim().is_empty() {
            return Err(CoreError::Validation("Watermark text is empty".to_string()));
        }
        if job.kind == TaskKind::Single && job.inputs.len() != 1 {
            return Err(CoreError::Validation(format!(
                "Single task expects exactly one input, got {}",
                job.inputs.len()
            )));
        }

        let files = job
            .inputs
            .iter()
            .map(|input| FileOutcome::pending(input.clone()))
            .collect();
        let task = self.store.create(job.kind, self.max_retries, files);
        let id = task.id;

        let runner = Arc::clone(&self.runner);
        let permits = Arc::clone(&self.permits);
        self.tracker.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                // Pool torn down during shutdown; leave the record pending.
                Err(_) => return,
            };
            runner
                .run(
                    id,
                    RenderRequest {
                        inputs: job.inputs,
                        spec: job.spec,
                    },
                )
                .await;
        });

        tracing::debug!(task_id = %id, "Task submitted");
        Ok(id)
    }

    /// Read-through snapshot of one record.
    pub fn status(&self, id: TaskId) -> Result<Task> {
        self.store.get(id)
    }

    /// Stop accepting work and wait for in-flight tasks to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
