//! Per-asset-type build tasks.
//!
//! Each task reads its sources from the project, runs them through its
//! transform chain and external tools, and writes into its own part of the
//! output tree. Tasks never read each other's output.

pub mod clean;
pub mod files;
pub mod fonts;
pub mod images;
pub mod scripts;
pub mod styles;
pub mod views;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::build::{BuildContext, DiscoveryError, TaskKind};
use crate::tools::ToolError;
use crate::transforms::TransformError;

/// Output subdirectory of the fonts task.
pub const FONTS_DIR: &str = "statics/fonts";
/// Output subdirectory of the styles task.
pub const STYLES_DIR: &str = "statics/styles";
/// Output subdirectory of the scripts task.
pub const SCRIPTS_DIR: &str = "statics/scripts";
/// Output subdirectory of the images task.
pub const IMAGES_DIR: &str = "statics/images";

/// Error that fails a task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Reading a source or writing an output failed
    #[error("{}: {source}", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
    /// A required source file does not exist
    #[error("{}: source not found", .0.display())]
    MissingSource(PathBuf),
    /// The output directory contains the project itself
    #[error("refusing to clean {}: it contains the project root", .0.display())]
    UnsafeClean(PathBuf),
    /// A configured glob is invalid
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// An external compiler failed
    #[error(transparent)]
    Tool(#[from] ToolError),
    /// A transform step failed
    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl TaskError {
    /// Build a closure that wraps an I/O error with `path`.
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> TaskError + '_ {
        move |source| TaskError::Io { path: path.to_path_buf(), source }
    }
}

/// What a task did.
#[derive(Debug, Default, Clone)]
pub struct TaskOutput {
    /// Files written, in write order
    pub written: Vec<PathBuf>,
    /// Sources left alone because their output was already up to date
    pub up_to_date: usize,
    /// Non-fatal problems
    pub warnings: Vec<String>,
}

impl TaskOutput {
    /// Record a written file.
    pub fn wrote(&mut self, path: PathBuf) {
        self.written.push(path);
    }

    /// Record and log a warning.
    pub fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Run one task against `ctx`.
pub fn run_task(kind: TaskKind, ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    match kind {
        TaskKind::Clean => clean::run(ctx),
        TaskKind::Fonts => fonts::run(ctx),
        TaskKind::Styles => styles::run(ctx),
        TaskKind::Scripts => scripts::run(ctx),
        TaskKind::Images => images::run(ctx),
        TaskKind::Views => views::run(ctx),
        TaskKind::Files => files::run(ctx),
    }
}

/// Write `contents` to `path`, creating parent directories.
pub(crate) fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), TaskError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(TaskError::io(parent))?;
    }
    fs::write(path, contents).map_err(TaskError::io(path))
}

/// Read a UTF-8 source file.
pub(crate) fn read_source(path: &Path) -> Result<String, TaskError> {
    fs::read_to_string(path).map_err(TaskError::io(path))
}

/// `path` relative to the project root, for messages.
pub(crate) fn display_path(ctx: &BuildContext, path: &Path) -> String {
    path.strip_prefix(ctx.project_root()).unwrap_or(path).display().to_string()
}

/// File stem as a string, or an empty string.
pub(crate) fn stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}


#[cfg(test)]
mod tests {
    use super::testing::Fixture;
    use super::*;

    #[test]
    fn test_write_file_creates_parents() {
        let fixture = Fixture::new();
        let path = fixture.root().join("a/b/c.txt");
        write_file(&path, "x").expect("should write");
        assert_eq!(fs::read_to_string(path).expect("should read"), "x");
    }

    #[test]
    fn test_io_error_names_path() {
        let err = read_source(Path::new("/nonexistent/a.sass")).unwrap_err();
        assert!(err.to_string().starts_with("/nonexistent/a.sass: "));
    }

    #[test]
    fn test_display_path_is_project_relative() {
        let fixture = Fixture::new();
        let ctx = fixture.context(false);
        let path = fixture.root().join("assets/styles/pages/index.sass");
        assert_eq!(display_path(&ctx, &path), "assets/styles/pages/index.sass");
    }

    #[test]
    fn test_task_output_warn_records() {
        let mut output = TaskOutput::default();
        output.warn("styles: broken".to_string());
        assert_eq!(output.warnings, vec!["styles: broken"]);
    }
}
