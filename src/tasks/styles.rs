//! Stylesheet compilation.
//!
//! Each entry is prefixed with the shared variables import, compiled by the
//! external compiler, then prefixed, grouped and minified in-process. A
//! file that fails to compile or transform is reported and skipped; the
//! task itself still succeeds.

use std::path::Path;

use super::{display_path, read_source, stem, write_file, TaskError, TaskOutput, STYLES_DIR};
use crate::build::{discover_files, BuildContext};
use crate::reload::ReloadScope;
use crate::transforms::{Chain, CssOptimize, Prepend, Transform};

/// Steps applied to compiled CSS.
///
/// Minification is always structural; whitespace is only removed in
/// production.
pub fn css_chain(ctx: &BuildContext, filename: &str) -> Chain {
    Chain::new().then(CssOptimize::new(ctx.browsers(), ctx.is_production()).with_filename(filename))
}

/// Compile every stylesheet entry.
pub fn run(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let config = &ctx.config().styles;
    let out_dir = ctx.out_path(STYLES_DIR);
    let header = Prepend(config.header.clone());
    let mut output = TaskOutput::default();

    for source in discover_files(ctx.project_root(), &config.source)? {
        let name = display_path(ctx, &source);
        match compile_one(ctx, &header, &source, &name)? {
            Ok(css) => {
                let dest = out_dir.join(ctx.hashed_name(&stem(&source), "css"));
                write_file(&dest, css)?;
                output.wrote(dest);
            }
            Err(message) => output.warn(format!("{}: {}", name, message)),
        }
    }

    ctx.notify_reload(ReloadScope::Styles);
    Ok(output)
}

/// Compile one entry. The outer error is fatal, the inner one a warning.
fn compile_one(
    ctx: &BuildContext,
    header: &Prepend,
    source: &Path,
    name: &str,
) -> Result<Result<String, String>, TaskError> {
    let text = header.apply(read_source(source)?)?;
    let css = match ctx.tools().styles.compile(&text, source) {
        Ok(css) => css,
        Err(e) => return Ok(Err(e.to_string())),
    };
    Ok(css_chain(ctx, name).apply(css).map_err(|e| e.to_string()))
}
