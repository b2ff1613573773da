//! Template renderer.

use std::path::Path;
use std::process::Command;

use super::{run_with_stdin, ToolError};

/// Renders a template file with a JSON context into a document.
pub trait TemplateRenderer: Send + Sync {
    /// Render `template` with `context` exposed as template locals.
    fn render(
        &self,
        template: &Path,
        context: &serde_json::Value,
        pretty: bool,
    ) -> Result<String, ToolError>;
}

/// The pug command-line renderer.
///
/// The template is piped through stdin and `--path` is set so that
/// `include` and `extends` resolve relative to the template.
#[derive(Debug, Clone)]
pub struct PugCli {
    program: String,
}

impl PugCli {
    /// Use `program` (e.g. `"pug"` or a path to it).
    pub fn new(program: &str) -> Self {
        Self { program: program.to_string() }
    }

    fn command(&self, template: &Path, context: &serde_json::Value, pretty: bool) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--obj").arg(context.to_string()).arg("--path").arg(template);
        if pretty {
            cmd.arg("--pretty");
        }
        cmd
    }
}

impl TemplateRenderer for PugCli {
    fn render(
        &self,
        template: &Path,
        context: &serde_json::Value,
        pretty: bool,
    ) -> Result<String, ToolError> {
        let source = std::fs::read_to_string(template)?;
        run_with_stdin(self.command(template, context, pretty), &source)
    }
}
