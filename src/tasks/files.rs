//! Server-side files: `.htaccess`, `robots.txt` and the mail script.

use std::fs;
use std::path::Path;

use super::{display_path, TaskError, TaskOutput};
use crate::build::BuildContext;

/// Output name of the rendered server configuration.
pub const HTACCESS_FILE: &str = ".htaccess";

/// Output name of the rendered crawler rules.
pub const ROBOTS_FILE: &str = "robots.txt";

/// Render the two server files and copy the mail script.
///
/// A missing source is skipped with a warning. A template that fails to
/// render fails the task, since a broken `.htaccess` must not be deployed.
pub fn run(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let config = &ctx.config().files;
    let mut output = TaskOutput::default();

    render_to(ctx, &ctx.resolve(&config.htaccess), HTACCESS_FILE, &mut output)?;
    render_to(ctx, &ctx.resolve(&config.robots), ROBOTS_FILE, &mut output)?;

    let mail = ctx.resolve(&config.mail_script);
    if mail.is_file() {
        let name = mail.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        let dest = ctx.out_path(name);
        fs::create_dir_all(ctx.out_dir()).map_err(TaskError::io(&ctx.out_dir()))?;
        fs::copy(&mail, &dest).map_err(TaskError::io(&mail))?;
        output.wrote(dest);
    } else {
        output.warn(format!("{}: not found, skipped", display_path(ctx, &mail)));
    }

    Ok(output)
}

fn render_to(
    ctx: &BuildContext,
    template: &Path,
    file_name: &str,
    output: &mut TaskOutput,
) -> Result<(), TaskError> {
    if !template.is_file() {
        output.warn(format!("{}: not found, skipped", display_path(ctx, template)));
        return Ok(());
    }
    let locals = ctx.page_context(file_name);
    let text = ctx.tools().templates.render(template, &locals, false)?;
    let dest = ctx.out_path(file_name);
    super::write_file(&dest, text)?;
    output.wrote(dest);
    Ok(())
}
