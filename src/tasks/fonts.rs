//! Font copy.

use std::fs;

use super::{TaskError, TaskOutput, FONTS_DIR};
use crate::build::{discover_files, relative_to_glob, BuildContext};

/// Copy every font file into `statics/fonts`, keeping relative paths.
pub fn run(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let pattern = &ctx.config().fonts.source;
    let out_dir = ctx.out_path(FONTS_DIR);
    let mut output = TaskOutput::default();

    for source in discover_files(ctx.project_root(), pattern)? {
        let dest = out_dir.join(relative_to_glob(&source, ctx.project_root(), pattern));
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(TaskError::io(parent))?;
        }
        fs::copy(&source, &dest).map_err(TaskError::io(&source))?;
        output.wrote(dest);
    }

    Ok(output)
}
