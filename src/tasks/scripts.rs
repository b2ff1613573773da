//! Script bundling.

use std::fs;

use super::{TaskError, TaskOutput, SCRIPTS_DIR};
use crate::build::BuildContext;
use crate::reload::ReloadScope;
use crate::tools::BundleOptions;

/// Stem of the bundle file name.
pub const BUNDLE_STEM: &str = "script";

/// Bundler options for the current mode.
pub fn bundle_options(ctx: &BuildContext) -> BundleOptions {
    BundleOptions {
        target: ctx.config().scripts.target.clone(),
        sourcemap: !ctx.is_production(),
        minify: ctx.is_production(),
    }
}

/// Bundle the script entry into `statics/scripts`.
pub fn run(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let entry = ctx.resolve(&ctx.config().scripts.entry);
    if !entry.is_file() {
        return Err(TaskError::MissingSource(entry));
    }

    let out_dir = ctx.out_path(SCRIPTS_DIR);
    fs::create_dir_all(&out_dir).map_err(TaskError::io(&out_dir))?;

    let outfile = out_dir.join(ctx.hashed_name(BUNDLE_STEM, "js"));
    let options = bundle_options(ctx);
    ctx.tools().scripts.bundle(&entry, &outfile, &options)?;

    let mut output = TaskOutput::default();
    let map = outfile.with_extension("js.map");
    output.wrote(outfile);
    if options.sourcemap && map.is_file() {
        output.wrote(map);
    }

    ctx.notify_reload(ReloadScope::Page);
    Ok(output)
}
