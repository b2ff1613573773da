//! Build result types.
//!
//! Contains types for representing the outcome of build operations.

use std::path::PathBuf;
use std::time::Duration;

/// Status of a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// Task succeeded
    Success,
    /// Task skipped (filtered out or nothing to do)
    Skipped,
    /// Task failed with error
    Failed(String),
}

impl BuildStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success | BuildStatus::Skipped)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, BuildStatus::Failed(_))
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildStatus::Success => write!(f, "success"),
            BuildStatus::Skipped => write!(f, "skipped"),
            BuildStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of running a single task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Task that ran
    pub task_id: String,
    /// Outcome
    pub status: BuildStatus,
    /// Files written
    pub outputs: Vec<PathBuf>,
    /// Files left alone because their output was up to date
    pub up_to_date: usize,
    /// Task duration
    pub duration: Duration,
    /// Non-fatal problems (e.g. a stylesheet that failed to compile)
    pub warnings: Vec<String>,
}

impl TaskResult {
    /// Create a successful result.
    pub fn success(task_id: String, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self {
            task_id,
            status: BuildStatus::Success,
            outputs,
            up_to_date: 0,
            duration,
            warnings: vec![],
        }
    }

    /// Create a skipped result.
    pub fn skipped(task_id: String) -> Self {
        Self {
            task_id,
            status: BuildStatus::Skipped,
            outputs: vec![],
            up_to_date: 0,
            duration: Duration::ZERO,
            warnings: vec![],
        }
    }

    /// Create a failed result.
    pub fn failed(task_id: String, error: String, duration: Duration) -> Self {
        Self {
            task_id,
            status: BuildStatus::Failed(error),
            outputs: vec![],
            up_to_date: 0,
            duration,
            warnings: vec![],
        }
    }

    /// Add warnings to the result.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Record how many files were already up to date.
    pub fn with_up_to_date(mut self, count: usize) -> Self {
        self.up_to_date = count;
        self
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a complete build run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Results for each task, in run order
    pub tasks: Vec<TaskResult>,
    /// Total build duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create a new empty build result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task result.
    pub fn add_result(&mut self, result: TaskResult) {
        self.tasks.push(result);
    }

    /// Result for a given task id.
    pub fn get(&self, task_id: &str) -> Option<&TaskResult> {
        self.tasks.iter().find(|r| r.task_id == task_id)
    }

    /// Get the number of successful tasks.
    pub fn success_count(&self) -> usize {
        self.tasks.iter().filter(|r| matches!(r.status, BuildStatus::Success)).count()
    }

    /// Get the number of skipped tasks.
    pub fn skipped_count(&self) -> usize {
        self.tasks.iter().filter(|r| matches!(r.status, BuildStatus::Skipped)).count()
    }

    /// Get the number of failed tasks.
    pub fn failed_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if the overall build succeeded (no failures).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Get all outputs produced.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.tasks.iter().flat_map(|r| r.outputs.iter()).collect()
    }

    /// Get all warnings.
    pub fn all_warnings(&self) -> Vec<&String> {
        self.tasks.iter().flat_map(|r| r.warnings.iter()).collect()
    }

    /// Get failed task results.
    pub fn failures(&self) -> Vec<&TaskResult> {
        self.tasks.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// Format a summary of the build result.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let success = self.success_count();
        let skipped = self.skipped_count();
        let failed = self.failed_count();
        let total = self.tasks.len();

        if failed > 0 {
            lines.push(format!(
                "Build failed: {} succeeded, {} skipped, {} failed ({} total)",
                success, skipped, failed, total
            ));
            for task in self.failures() {
                lines.push(format!("  - {}: {}", task.task_id, task.status));
            }
        } else {
            lines.push(format!(
                "Build succeeded: {} tasks, {} files written in {:?}",
                total,
                self.all_outputs().len(),
                self.total_duration
            ));
        }

        let warnings = self.all_warnings();
        if !warnings.is_empty() {
            lines.push(format!("{} warning(s):", warnings.len()));
            for warning in warnings {
                lines.push(format!("  - {}", warning));
            }
        }

        lines.join("\n")
    }
}
