//! Stylesheet compiler.

use std::path::Path;
use std::process::Command;

use super::{run_with_stdin, ToolError};

/// Compiles one stylesheet-language source to CSS.
pub trait StyleCompiler: Send + Sync {
    /// Compile `source`, which was read from `path`. Relative imports
    /// resolve against the directory of `path`.
    fn compile(&self, source: &str, path: &Path) -> Result<String, ToolError>;
}

/// The Dart Sass command-line compiler.
#[derive(Debug, Clone)]
pub struct SassCli {
    program: String,
}

impl SassCli {
    /// Use `program` (e.g. `"sass"` or a path to it).
    pub fn new(program: &str) -> Self {
        Self { program: program.to_string() }
    }

    fn command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--stdin").arg("--no-source-map").arg("--style=expanded");
        if path.extension().is_some_and(|ext| ext == "sass") {
            cmd.arg("--indented");
        }
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.arg(format!("--load-path={}", dir.display()));
        }
        cmd
    }
}

impl StyleCompiler for SassCli {
    fn compile(&self, source: &str, path: &Path) -> Result<String, ToolError> {
        run_with_stdin(self.command(path), source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::command_string;

    #[test]
    fn test_indented_syntax_for_sass_files() {
        let cmd = SassCli::new("sass").command(Path::new("/site/styles/pages/index.sass"));
        assert_eq!(
            command_string(&cmd),
            "sass --stdin --no-source-map --style=expanded --indented --load-path=/site/styles/pages"
        );
    }

    #[test]
    fn test_scss_files_not_indented() {
        let cmd = SassCli::new("/opt/sass").command(Path::new("main.scss"));
        assert_eq!(command_string(&cmd), "/opt/sass --stdin --no-source-map --style=expanded");
    }
}
