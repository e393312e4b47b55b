//! Drives one task record through its state machine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use watermarker_core::{CoreError, FileState, Result, TaskId, TaskKind, TaskOutput};
use watermarker_render::{RenderEngine, RenderSpec};

use crate::hooks::{HookDispatcher, HookEvent};
use crate::retry::RetryPolicy;
use crate::store::TaskStore;

/// Inputs plus render settings for one task execution.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub inputs: Vec<PathBuf>,
    pub spec: RenderSpec,
}

/// Single writer for a task record: transitions status, applies the retry
/// policy around the rendering collaborator, keeps progress monotone, and
/// fires lifecycle hooks at state boundaries.
pub struct TaskRunner {
    store: Arc<TaskStore>,
    engine: Arc<dyn RenderEngine>,
    hooks: Arc<HookDispatcher>,
    retry: RetryPolicy,
}

impl TaskRunner {
    pub fn new(
        store: Arc<TaskStore>,
        engine: Arc<dyn RenderEngine>,
        hooks: Arc<HookDispatcher>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            engine,
            hooks,
            retry,
        }
    }

    /// Execute the task to a terminal state. Errors are fully absorbed
    /// here; callers observe the outcome only through the store.
    pub async fn run(&self, id: TaskId, request: RenderRequest) {
        if let Err(err) = self.execute(id, request).await {
            tracing::error!(task_id = %id, %err, "Task execution aborted");
        }
    }

    async fn execute(&self, id: TaskId, request: RenderRequest) -> Result<()> {
        let task = self.store.update(id, |task| task.mark_processing())?;
        self.hooks.fire(HookEvent::Start, &task);
        tracing::info!(task_id = %id, kind = ?task.kind, files = request.inputs.len(), "Task started");

        // Output names carry the task id so concurrent tasks never clobber
        // each other in a shared output directory.
        let spec = request.spec.with_tag(id.short());

        // The scheduler rejects empty submissions, but this is a public
        // entry point; fail the record rather than panic on indexing.
        let Some(first) = request.inputs.first() else {
            let task = self
                .store
                .update(id, |task| task.mark_failed("No input files provided"))?;
            self.hooks.fire(HookEvent::Error, &task);
            return Ok(());
        };

        match task.kind {
            TaskKind::Single => self.run_single(id, first, &spec).await,
            TaskKind::Batch => self.run_batch(id, &request.inputs, &spec).await,
        }
    }

    async fn run_single(&self, id: TaskId, input: &Path, spec: &RenderSpec) -> Result<()> {
        match self.render_with_retries(id, input, spec, self.retry.max_retries).await {
            Ok(output) => {
                let task = self.store.update(id, |task| {
                    if let Some(file) = task.files.first_mut() {
                        file.state = FileState::Succeeded {
                            output: output.clone(),
                        };
                    }
                    task.mark_completed(TaskOutput {
                        outputs: vec![output.clone()],
                    })
                })?;
                self.hooks.fire(HookEvent::Completion, &task);
                tracing::info!(task_id = %id, "Task completed");
            }
            Err(err) => {
                let reason = err.to_string();
                let task = self.store.update(id, |task| {
                    if let Some(file) = task.files.first_mut() {
                        file.state = FileState::Failed {
                            reason: reason.clone(),
                        };
                    }
                    task.mark_failed(reason.clone())
                })?;
                self.hooks.fire(HookEvent::Error, &task);
                tracing::error!(task_id = %id, error = %reason, "Task failed");
            }
        }
        Ok(())
    }

    /// Files are processed in submitted order with an independent retry
    /// budget per file. The first file to exhaust its budget fails the
    /// whole batch; earlier successes stay visible in the sub-results and
    /// later files are never attempted.
    async fn run_batch(&self, id: TaskId, inputs: &[PathBuf], spec: &RenderSpec) -> Result<()> {
        let total = inputs.len();
        let mut outputs = Vec::with_capacity(total);

        for (idx, input) in inputs.iter().enumerate() {
            // Fresh retry counter for this file's budget.
            self.store.update(id, |task| {
                task.retry_count = 0;
                Ok(())
            })?;

            match self.render_with_retries(id, input, spec, self.retry.max_retries).await {
                Ok(output) => {
                    outputs.push(output.clone());
                    let progress = (100 * (idx + 1) / total) as u8;
                    self.store.update(id, |task| {
                        task.files[idx].state = FileState::Succeeded { output };
                        task.advance_progress(progress);
                        Ok(())
                    })?;
                }
                Err(err) => {
                    let reason = format!("{}: {err}", input.display());
                    let task = self.store.update(id, |task| {
                        task.files[idx].state = FileState::Failed {
                            reason: err.to_string(),
                        };
                        task.mark_failed(reason.clone())
                    })?;
                    self.hooks.fire(HookEvent::Error, &task);
                    tracing::error!(task_id = %id, error = %reason, "Batch task failed");
                    return Ok(());
                }
            }
        }

        let task = self
            .store
            .update(id, |task| task.mark_completed(TaskOutput { outputs }))?;
        self.hooks.fire(HookEvent::Completion, &task);
        tracing::info!(task_id = %id, files = total, "Batch task completed");
        Ok(())
    }

    /// Bounded attempt loop around the rendering collaborator. The task
    /// stays `processing` throughout; only the retry counter moves.
    async fn render_with_retries(
        &self,
        id: TaskId,
        input: &Path,
        spec: &RenderSpec,
        budget: u32,
    ) -> Result<PathBuf> {
        let mut attempt: u32 = 0;
        loop {
            match self.engine.render(input, spec).await {
                Ok(output) => return Ok(output),
                Err(err) => {
                    if attempt >= budget {
                        return Err(CoreError::RetryBudgetExceeded {
                            attempts: attempt + 1,
                            last_error: err.to_string(),
                        });
                    }
                    let delay = self.retry.delay_for(attempt);
                    attempt += 1;
                    self.store.update(id, |task| {
                        task.retry_count = attempt;
                        Ok(())
                    })?;
                    tracing::warn!(
                        task_id = %id,
                        input = %input.display(),
                        attempt,
                        delay_secs = delay.as_secs_f64(),
                        %err,
                        "Render failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
