//! Output directory cleaning.

use std::fs;
use std::path::{Component, Path, PathBuf};

use super::{TaskError, TaskOutput};
use crate::build::BuildContext;

/// Empty the output directory, creating it if missing.
pub fn run(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let out_dir = ctx.out_dir();
    let project_root = resolve(ctx.project_root()).map_err(TaskError::io(ctx.project_root()))?;
    if project_root.starts_with(resolve(&out_dir).map_err(TaskError::io(&out_dir))?) {
        return Err(TaskError::UnsafeClean(out_dir));
    }
    let removed = clean_dir(&out_dir)?;
    tracing::debug!(dir = %out_dir.display(), removed, "cleaned");
    Ok(TaskOutput::default())
}

/// Absolute form of `path` with `.` and `..` resolved and symlinks followed
/// as far as the path exists.
fn resolve(path: &Path) -> std::io::Result<PathBuf> {
    let mut lexical = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::ParentDir => {
                lexical.pop();
            }
            Component::CurDir => {}
            other => lexical.push(other),
        }
    }

    let mut existing = lexical.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return Ok(missing.iter().rev().fold(canonical, |path, name| path.join(name)));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(lexical),
        }
    }
}

/// Remove every entry under `dir`, keeping `dir` itself.
///
/// Returns the number of top-level entries removed. Symlinks are removed,
/// never followed.
pub fn clean_dir(dir: &Path) -> Result<usize, TaskError> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(TaskError::io(dir))?;
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(dir).map_err(TaskError::io(dir))? {
        let entry = entry.map_err(TaskError::io(dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(TaskError::io(&path))?;
        if file_type.is_dir() {
            fs::remove_dir_all(&path).map_err(TaskError::io(&path))?;
        } else {
            fs::remove_file(&path).map_err(TaskError::io(&path))?;
        }
        removed += 1;
    }
    Ok(removed)
}
