//! Build pipeline orchestration.
//!
//! The pipeline runs the tasks of a plan in dependency order, one at a
//! time, and reports progress as it goes. A failing task is recorded and
//! the run continues, except for `clean`: writing into a directory that
//! could not be emptied would mix stale and fresh output, so a clean
//! failure aborts the run.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::build::progress::{NullProgress, ProgressEvent, ProgressReporter, TaskStatus};
use crate::build::{
    AssetTask, BuildContext, BuildOrderError, BuildPlan, BuildResult, BuildStatus, TaskKind,
    TaskResult,
};
use crate::tasks::run_task;

/// Error that stops a build run.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The plan has a dependency cycle
    #[error("Build order error: {0}")]
    Order(#[from] BuildOrderError),
    /// A task whose failure is fatal did not succeed
    #[error("{task} failed, build aborted: {message}")]
    Aborted {
        /// Task that failed
        task: String,
        /// Its error
        message: String,
    },
}

/// Runs build plans against a shared context.
pub struct BuildPipeline {
    /// Build context
    context: Arc<BuildContext>,
    /// Progress sink
    reporter: Arc<dyn ProgressReporter>,
}

impl std::fmt::Debug for BuildPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildPipeline").field("context", &self.context).finish_non_exhaustive()
    }
}

impl Clone for BuildPipeline {
    fn clone(&self) -> Self {
        Self { context: Arc::clone(&self.context), reporter: Arc::clone(&self.reporter) }
    }
}

impl BuildPipeline {
    /// Create a pipeline that reports nothing.
    pub fn new(context: Arc<BuildContext>) -> Self {
        Self { context, reporter: Arc::new(NullProgress) }
    }

    /// Report progress to `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// The shared build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Run every task of `plan` in dependency order.
    pub fn run(&self, plan: &BuildPlan) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let ordered = plan.build_order()?;

        tracing::debug!(
            mode = %self.context.env().mode,
            hash = %self.context.env().content_hash,
            tasks = ?ordered.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            "build plan"
        );
        self.reporter.report(ProgressEvent::BuildStarted { total_tasks: ordered.len() });

        let mut result = BuildResult::new();
        for task in ordered {
            let task_result = self.run_task(task);
            if let (TaskKind::Clean, BuildStatus::Failed(message)) = (task.kind, &task_result.status)
            {
                let message = message.clone();
                result.add_result(task_result);
                result.total_duration = start.elapsed();
                self.report_completed(&result);
                return Err(BuildError::Aborted { task: task.id.clone(), message });
            }
            result.add_result(task_result);
        }

        result.total_duration = start.elapsed();
        self.report_completed(&result);
        Ok(result)
    }

    /// Run a single task and report it.
    pub fn run_task(&self, task: &AssetTask) -> TaskResult {
        let start = Instant::now();
        self.reporter.report(ProgressEvent::TaskStarted { task_id: task.id.clone() });

        let result = match run_task(task.kind, &self.context) {
            Ok(output) => {
                TaskResult::success(task.id.clone(), output.written, start.elapsed())
                    .with_up_to_date(output.up_to_date)
                    .with_warnings(output.warnings)
            }
            Err(e) => {
                tracing::error!(task = %task.id, error = %e, "task failed");
                TaskResult::failed(task.id.clone(), e.to_string(), start.elapsed())
            }
        };

        for warning in &result.warnings {
            self.reporter.report(ProgressEvent::Warning {
                task_id: Some(task.id.clone()),
                message: warning.clone(),
            });
        }
        self.reporter.report(ProgressEvent::TaskCompleted {
            task_id: task.id.clone(),
            status: match &result.status {
                BuildStatus::Success => TaskStatus::Success,
                BuildStatus::Skipped => TaskStatus::Skipped,
                BuildStatus::Failed(e) => TaskStatus::Failed(e.clone()),
            },
            duration_ms: result.duration.as_millis() as u64,
            files: result.outputs.len(),
        });

        result
    }

    fn report_completed(&self, result: &BuildResult) {
        self.reporter.report(ProgressEvent::BuildCompleted {
            success: result.is_success(),
            duration_ms: result.total_duration.as_millis() as u64,
            succeeded: result.success_count(),
            skipped: result.skipped_count(),
            failed: result.failed_count(),
        });
    }
}
