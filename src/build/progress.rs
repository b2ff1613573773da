//! Build progress reporting.
//!
//! The pipeline emits [`ProgressEvent`]s; a [`ProgressReporter`] turns them
//! into console lines, JSON lines, or nothing at all.
//!
//! # Example
//!
//! ```ignore
//! use sitepipe::build::progress::{ConsoleProgress, ProgressEvent, ProgressReporter, TaskStatus};
//!
//! let reporter = ConsoleProgress::new();
//! reporter.report(ProgressEvent::BuildStarted { total_tasks: 7 });
//! reporter.report(ProgressEvent::TaskCompleted {
//!     task_id: "styles".to_string(),
//!     status: TaskStatus::Success,
//!     duration_ms: 150,
//!     files: 3,
//! });
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::json;

/// Status of a task in progress events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task ran successfully
    Success,
    /// Task was skipped
    Skipped,
    /// Task failed
    Failed(String),
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Skipped => write!(f, "skipped"),
            TaskStatus::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Events that can be reported during a build.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Build process started
    BuildStarted {
        /// Total number of tasks to run
        total_tasks: usize,
    },
    /// A task started
    TaskStarted {
        /// Task identifier
        task_id: String,
    },
    /// A task completed
    TaskCompleted {
        /// Task identifier
        task_id: String,
        /// Outcome
        status: TaskStatus,
        /// Duration in milliseconds
        duration_ms: u64,
        /// Number of files written
        files: usize,
    },
    /// Build process completed
    BuildCompleted {
        /// Whether the overall build succeeded
        success: bool,
        /// Total duration in milliseconds
        duration_ms: u64,
        /// Number of successful tasks
        succeeded: usize,
        /// Number of skipped tasks
        skipped: usize,
        /// Number of failed tasks
        failed: usize,
    },
    /// A warning was generated
    Warning {
        /// Task that generated the warning (if applicable)
        task_id: Option<String>,
        /// Warning message
        message: String,
    },
    /// An error occurred
    Error {
        /// Task that generated the error (if applicable)
        task_id: Option<String>,
        /// Error message
        message: String,
    },
}

/// Trait for progress reporters.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event.
    fn report(&self, event: ProgressEvent);

    /// Check if this reporter wants verbose output.
    fn is_verbose(&self) -> bool {
        false
    }
}

/// A progress reporter that discards all events.
#[derive(Debug, Default)]
pub struct NullProgress;

impl NullProgress {
    /// Create a new null progress reporter.
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Console progress reporter with optional colors.
pub struct ConsoleProgress {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show verbose output
    verbose: bool,
    /// Current task count
    current: AtomicUsize,
    /// Total task count
    total: AtomicUsize,
    /// Output writer (for testing)
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleProgress")
            .field("use_colors", &self.use_colors)
            .field("verbose", &self.verbose)
            .field("current", &self.current)
            .field("total", &self.total)
            .finish()
    }
}

impl ConsoleProgress {
    /// Create a new console progress reporter writing to stderr.
    pub fn new() -> Self {
        Self {
            use_colors: true,
            verbose: false,
            current: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            output: Mutex::new(Box::new(std::io::stderr())),
        }
    }

    /// Create a console progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self {
            use_colors: false,
            verbose: false,
            current: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            output: Mutex::new(Box::new(output)),
        }
    }

    /// Set whether to use colors.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn color(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.color(text, "\x1b[32m")
    }

    fn yellow(&self, text: &str) -> String {
        self.color(text, "\x1b[33m")
    }

    fn red(&self, text: &str) -> String {
        self.color(text, "\x1b[31m")
    }

    fn cyan(&self, text: &str) -> String {
        self.color(text, "\x1b[36m")
    }

    fn bold(&self, text: &str) -> String {
        self.color(text, "\x1b[1m")
    }

    fn writeln(&self, line: &str) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::BuildStarted { total_tasks } => {
                self.total.store(total_tasks, Ordering::SeqCst);
                self.current.store(0, Ordering::SeqCst);
                if total_tasks > 0 {
                    self.writeln(&format!(
                        "{} Running {} task{}...",
                        self.cyan("[build]"),
                        total_tasks,
                        if total_tasks == 1 { "" } else { "s" }
                    ));
                }
            }
            ProgressEvent::TaskStarted { task_id } => {
                if self.verbose {
                    let current = self.current.load(Ordering::SeqCst) + 1;
                    let total = self.total.load(Ordering::SeqCst);
                    self.writeln(&format!(
                        "{} [{}/{}] Running {}...",
                        self.cyan("[build]"),
                        current,
                        total,
                        task_id
                    ));
                }
            }
            ProgressEvent::TaskCompleted { task_id, status, duration_ms, files } => {
                let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                let total = self.total.load(Ordering::SeqCst).max(current);

                let status_str = match &status {
                    TaskStatus::Success => self.green("ok"),
                    TaskStatus::Skipped => self.yellow("skipped"),
                    TaskStatus::Failed(_) => self.red("FAILED"),
                };

                self.writeln(&format!(
                    "{} [{}/{}] {} {} ({} file{}, {})",
                    self.cyan("[build]"),
                    current,
                    total,
                    status_str,
                    task_id,
                    files,
                    if files == 1 { "" } else { "s" },
                    format_duration(duration_ms)
                ));

                if let TaskStatus::Failed(err) = status {
                    for line in err.lines() {
                        self.writeln(&format!("        {}", self.red(line)));
                    }
                }
            }
            ProgressEvent::BuildCompleted { success, duration_ms, succeeded, skipped, failed } => {
                let duration_str = format_duration(duration_ms);
                let total = succeeded + skipped + failed;

                if success {
                    self.writeln(&format!(
                        "{} {} {} finished in {}",
                        self.green("[done]"),
                        self.bold(&format!("{}", total)),
                        if total == 1 { "task" } else { "tasks" },
                        duration_str
                    ));
                } else {
                    self.writeln(&format!(
                        "{} Build failed: {} succeeded, {} skipped, {} {} in {}",
                        self.red("[error]"),
                        succeeded,
                        skipped,
                        failed,
                        if failed == 1 { "failure" } else { "failures" },
                        duration_str
                    ));
                }
            }
            ProgressEvent::Warning { task_id, message } => {
                let prefix = task_id.map(|id| format!("{}: ", id)).unwrap_or_default();
                self.writeln(&format!("{} {}{}", self.yellow("[warn]"), prefix, message));
            }
            ProgressEvent::Error { task_id, message } => {
                let prefix = task_id.map(|id| format!("{}: ", id)).unwrap_or_default();
                self.writeln(&format!("{} {}{}", self.red("[error]"), prefix, message));
            }
        }
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// JSON-lines progress reporter for machine-readable output.
pub struct JsonProgress {
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for JsonProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonProgress").finish()
    }
}

impl JsonProgress {
    /// Create a new JSON progress reporter writing to stderr.
    pub fn new() -> Self {
        Self { output: Mutex::new(Box::new(std::io::stderr())) }
    }

    /// Create a JSON progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { output: Mutex::new(Box::new(output)) }
    }
}

impl Default for JsonProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let value = match event {
            ProgressEvent::BuildStarted { total_tasks } => {
                json!({"event": "build_started", "total_tasks": total_tasks})
            }
            ProgressEvent::TaskStarted { task_id } => {
                json!({"event": "task_started", "task_id": task_id})
            }
            ProgressEvent::TaskCompleted { task_id, status, duration_ms, files } => {
                let mut value = json!({
                    "event": "task_completed",
                    "task_id": task_id,
                    "status": match &status {
                        TaskStatus::Success => "success",
                        TaskStatus::Skipped => "skipped",
                        TaskStatus::Failed(_) => "failed",
                    },
                    "duration_ms": duration_ms,
                    "files": files,
                });
                if let TaskStatus::Failed(error) = status {
                    value["error"] = json!(error);
                }
                value
            }
            ProgressEvent::BuildCompleted { success, duration_ms, succeeded, skipped, failed } => {
                json!({
                    "event": "build_completed",
                    "success": success,
                    "duration_ms": duration_ms,
                    "succeeded": succeeded,
                    "skipped": skipped,
                    "failed": failed,
                })
            }
            ProgressEvent::Warning { task_id, message } => {
                json!({"event": "warning", "message": message, "task_id": task_id})
            }
            ProgressEvent::Error { task_id, message } => {
                json!({"event": "error", "message": message, "task_id": task_id})
            }
        };
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", value);
        }
    }
}

/// Progress tracker for aggregating build statistics.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    start_time: Option<Instant>,
    total: usize,
    completed: usize,
    succeeded: usize,
    skipped: usize,
    failed: usize,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a build.
    pub fn start(&mut self, total_tasks: usize) {
        *self = Self { start_time: Some(Instant::now()), total: total_tasks, ..Self::default() };
    }

    /// Mark a task as completed.
    pub fn task_completed(&mut self, status: &TaskStatus) {
        self.completed += 1;
        match status {
            TaskStatus::Success => self.succeeded += 1,
            TaskStatus::Skipped => self.skipped += 1,
            TaskStatus::Failed(_) => self.failed += 1,
        }
    }

    /// Get the elapsed time since the build started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    /// Check if every task has completed.
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    /// Check if the build was successful.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Generate a BuildCompleted event from current state.
    pub fn build_completed_event(&self) -> ProgressEvent {
        ProgressEvent::BuildCompleted {
            success: self.is_success(),
            duration_ms: self.elapsed().as_millis() as u64,
            succeeded: self.succeeded,
            skipped: self.skipped,
            failed: self.failed,
        }
    }
}

/// Format a duration in milliseconds to a human-readable string.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60_000;
        let seconds = (ms % 60_000) / 1000;
        format!("{}m {}s", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Shared in-memory writer so tests can read what a reporter wrote.
    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0ms");
        assert_eq!(format_duration(999), "999ms");
        assert_eq!(format_duration(1500), "1.5s");
        assert_eq!(format_duration(125_000), "2m 5s");
    }

    #[test]
    fn test_console_progress_task_lines() {
        let buffer = Buffer::default();
        let reporter = ConsoleProgress::with_output(buffer.clone());

        reporter.report(ProgressEvent::BuildStarted { total_tasks: 2 });
        reporter.report(ProgressEvent::TaskCompleted {
            task_id: "styles".into(),
            status: TaskStatus::Success,
            duration_ms: 12,
            files: 3,
        });
        reporter.report(ProgressEvent::TaskCompleted {
            task_id: "scripts".into(),
            status: TaskStatus::Failed("unexpected token".into()),
            duration_ms: 4,
            files: 0,
        });

        let out = buffer.contents();
        assert!(out.contains("[build] Running 2 tasks..."));
        assert!(out.contains("[build] [1/2] ok styles (3 files, 12ms)"));
        assert!(out.contains("[build] [2/2] FAILED scripts (0 files, 4ms)"));
        assert!(out.contains("        unexpected token"));
        assert!(!out.contains("\x1b["));
    }

    #[test]
    fn test_console_progress_started_only_when_verbose() {
        let buffer = Buffer::default();
        let reporter = ConsoleProgress::with_output(buffer.clone());
        reporter.report(ProgressEvent::TaskStarted { task_id: "views".into() });
        assert!(buffer.contents().is_empty());

        let reporter = ConsoleProgress::with_output(buffer.clone()).with_verbose(true);
        reporter.report(ProgressEvent::TaskStarted { task_id: "views".into() });
        assert!(buffer.contents().contains("Running views..."));
    }

    #[test]
    fn test_console_progress_colors() {
        let buffer = Buffer::default();
        let reporter = ConsoleProgress::with_output(buffer.clone()).with_colors(true);
        reporter.report(ProgressEvent::Warning { task_id: None, message: "careful".into() });
        assert!(buffer.contents().contains("\x1b[33m[warn]\x1b[0m careful"));
    }

    #[test]
    fn test_json_progress_lines_parse() {
        let buffer = Buffer::default();
        let reporter = JsonProgress::with_output(buffer.clone());
        reporter.report(ProgressEvent::TaskCompleted {
            task_id: "views".into(),
            status: TaskStatus::Failed("bad \"quote\"".into()),
            duration_ms: 1,
            files: 0,
        });
        reporter.report(ProgressEvent::Warning {
            task_id: Some("styles".into()),
            message: "x".into(),
        });

        let contents = buffer.contents();
        let lines: Vec<serde_json::Value> =
            contents.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines[0]["event"], "task_completed");
        assert_eq!(lines[0]["status"], "failed");
        assert_eq!(lines[0]["error"], "bad \"quote\"");
        assert_eq!(lines[1]["task_id"], "styles");
    }

    #[test]
    fn test_progress_tracker() {
        let mut tracker = ProgressTracker::new();
        tracker.start(3);
        tracker.task_completed(&TaskStatus::Success);
        tracker.task_completed(&TaskStatus::Skipped);
        assert!(!tracker.is_complete());
        tracker.task_completed(&TaskStatus::Failed("x".into()));
        assert!(tracker.is_complete());
        assert!(!tracker.is_success());

        match tracker.build_completed_event() {
            ProgressEvent::BuildCompleted { succeeded, skipped, failed, success, .. } => {
                assert_eq!((succeeded, skipped, failed, success), (1, 1, 1, false));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
