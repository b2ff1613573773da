//! Raster images, SVG optimization and the favicon.
//!
//! Raster files and SVGs are skipped when their output is at least as new
//! as the source, so repeated watch rebuilds only touch what changed.

use std::fs;
use std::path::Path;

use super::{display_path, read_source, write_file, TaskError, TaskOutput, IMAGES_DIR};
use crate::build::{copy_if_newer, discover_files, is_up_to_date, relative_to_glob, BuildContext};
use crate::reload::ReloadScope;
use crate::transforms::{SvgOptimize, Transform};

/// Output name of the favicon, at the output root.
pub const FAVICON: &str = "favicon.ico";

/// Run the three image steps in order.
pub fn run(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let mut output = TaskOutput::default();
    copy_raster(ctx, &mut output)?;
    optimize_svg(ctx, &mut output)?;
    copy_favicon(ctx, &mut output)?;
    ctx.notify_reload(ReloadScope::Page);
    Ok(output)
}

/// Copy raster and icon files unchanged.
fn copy_raster(ctx: &BuildContext, output: &mut TaskOutput) -> Result<(), TaskError> {
    let pattern = &ctx.config().images.raster;
    let out_dir = ctx.out_path(IMAGES_DIR);

    for source in discover_files(ctx.project_root(), pattern)? {
        let dest = out_dir.join(relative_to_glob(&source, ctx.project_root(), pattern));
        if copy_if_newer(&source, &dest).map_err(TaskError::io(&dest))? {
            output.wrote(dest);
        } else {
            output.up_to_date += 1;
        }
    }
    Ok(())
}

/// Optimize SVGs. A file without an `<svg>` root is copied as written.
fn optimize_svg(ctx: &BuildContext, output: &mut TaskOutput) -> Result<(), TaskError> {
    let pattern = &ctx.config().images.svg;
    let out_dir = ctx.out_path(IMAGES_DIR);

    for source in discover_files(ctx.project_root(), pattern)? {
        let dest = out_dir.join(relative_to_glob(&source, ctx.project_root(), pattern));
        if is_up_to_date(&source, &dest) {
            output.up_to_date += 1;
            continue;
        }

        let text = read_source(&source)?;
        let svg = match SvgOptimize.apply(text.clone()) {
            Ok(svg) => svg,
            Err(e) => {
                output.warn(format!("{}: {}", display_path(ctx, &source), e));
                text
            }
        };
        write_file(&dest, svg)?;
        output.wrote(dest);
    }
    Ok(())
}

/// Copy the favicon to the output root, if the project has one.
fn copy_favicon(ctx: &BuildContext, output: &mut TaskOutput) -> Result<(), TaskError> {
    let source = ctx.resolve(&ctx.config().images.favicon);
    if !source.is_file() {
        tracing::debug!(path = %source.display(), "no favicon");
        return Ok(());
    }
    let dest = ctx.out_path(FAVICON);
    copy_file(&source, &dest)?;
    output.wrote(dest);
    Ok(())
}

fn copy_file(source: &Path, dest: &Path) -> Result<(), TaskError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(TaskError::io(parent))?;
    }
    fs::copy(source, dest).map_err(TaskError::io(source))?;
    Ok(())
}
