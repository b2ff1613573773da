//! Watch mode: re-run the task that owns a changed file.
//!
//! Every task in the plan contributes its watch glob (or its source glob when
//! it has none). Debounced filesystem events under the project root are
//! matched against those globs, and each affected task is run again on its
//! own, in plan order.

use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use thiserror::Error;

use crate::build::{
    AssetTask, BuildOrderError, BuildPipeline, BuildPlan, BuildStatus, DiscoveryError, GlobMatcher,
};
use crate::config::WatchConfig;

/// Error during watch mode
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch path: {0}")]
    WatchPath(#[source] notify::Error),
    /// The event channel closed
    #[error("Channel error: {0}")]
    ChannelError(String),
    /// Project root does not exist
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// The plan has a dependency cycle
    #[error(transparent)]
    Plan(#[from] BuildOrderError),
    /// A watch glob did not compile
    #[error("invalid watch glob for {task}: {source}")]
    Glob {
        /// Task owning the glob
        task: String,
        /// Underlying error
        #[source]
        source: DiscoveryError,
    },
}

/// Watch globs of a plan, compiled against the project root.
#[derive(Debug, Clone)]
pub struct WatchTargets {
    targets: Vec<(AssetTask, GlobMatcher)>,
}

impl WatchTargets {
    /// Compile the watch globs of `plan`, in build order.
    ///
    /// Tasks with neither a watch nor a source glob are not watched.
    pub fn new(plan: &BuildPlan, root: &Path) -> Result<Self, WatchError> {
        let ordered = plan.build_order()?;
        let mut targets = Vec::new();
        for task in ordered {
            let Some(glob) = task.watch_glob.as_ref().or(task.source_glob.as_ref()) else {
                continue;
            };
            let matcher = GlobMatcher::new(root, glob)
                .map_err(|source| WatchError::Glob { task: task.id.clone(), source })?;
            targets.push((task.clone(), matcher));
        }
        Ok(Self { targets })
    }

    /// Tasks owning any of `paths`, each once, in build order.
    pub fn affected<'a, P: AsRef<Path>>(&'a self, paths: &[P]) -> Vec<&'a AssetTask> {
        self.targets
            .iter()
            .filter(|(_, matcher)| paths.iter().any(|p| matcher.matches(p.as_ref())))
            .map(|(task, _)| task)
            .collect()
    }

    /// Ids of the watched tasks.
    pub fn task_ids(&self) -> Vec<&str> {
        self.targets.iter().map(|(task, _)| task.id.as_str()).collect()
    }

    /// Whether no task is watched.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Options for watch mode
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Project root; watched recursively
    pub root: PathBuf,
    /// Debounce and screen settings
    pub config: WatchConfig,
}

/// Clear the terminal screen
fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
}

/// Watch `options.root` and re-run affected tasks of `plan` until the event
/// channel closes.
///
/// The initial build is the caller's job. This blocks the calling thread.
pub fn watch_and_rebuild(
    pipeline: &BuildPipeline,
    plan: &BuildPlan,
    options: &WatchOptions,
) -> Result<(), WatchError> {
    if !options.root.is_dir() {
        return Err(WatchError::SourceNotFound(options.root.clone()));
    }
    // notify reports canonical paths
    let root = options.root.canonicalize().unwrap_or_else(|_| options.root.clone());
    let targets = WatchTargets::new(plan, &root)?;

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(u64::from(options.config.debounce_ms));
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;
    debouncer.watcher().watch(&root, RecursiveMode::Recursive).map_err(WatchError::WatchPath)?;

    tracing::info!(root = %root.display(), tasks = ?targets.task_ids(), "watching for changes");

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<&Path> = events
                    .iter()
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .map(|e| e.path.as_path())
                    .collect();
                let affected = targets.affected(&changed);
                if affected.is_empty() {
                    continue;
                }

                if options.config.clear_screen {
                    clear_screen();
                }
                for path in &changed {
                    tracing::debug!(path = %path.display(), "changed");
                }
                for task in affected {
                    let result = pipeline.run_task(task);
                    if let BuildStatus::Failed(message) = &result.status {
                        tracing::warn!(task = %task.id, error = %message, "rebuild failed, still watching");
                    }
                }
            }
            Ok(Err(error)) => {
                tracing::warn!(error = ?error, "watch error, continuing");
            }
            Err(e) => {
                return Err(WatchError::ChannelError(e.to_string()));
            }
        }
    }
}
