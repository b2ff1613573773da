//! Script bundler.

use std::path::Path;
use std::process::Command;

use super::{run, ToolError};

/// Per-build bundling options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleOptions {
    /// Syntax target, e.g. `es2015`
    pub target: String,
    /// Write an external source map next to the bundle
    pub sourcemap: bool,
    /// Minify the bundle
    pub minify: bool,
}

/// Bundles an entry module and everything it imports into one file.
pub trait ScriptBundler: Send + Sync {
    /// Bundle `entry` into `outfile`.
    fn bundle(&self, entry: &Path, outfile: &Path, options: &BundleOptions) -> Result<(), ToolError>;
}

/// The esbuild command-line bundler.
#[derive(Debug, Clone)]
pub struct EsbuildCli {
    program: String,
}

impl EsbuildCli {
    /// Use `program` (e.g. `"esbuild"` or a path to it).
    pub fn new(program: &str) -> Self {
        Self { program: program.to_string() }
    }

    fn command(&self, entry: &Path, outfile: &Path, options: &BundleOptions) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(entry)
            .arg("--bundle")
            .arg(format!("--target={}", options.target))
            .arg(format!("--outfile={}", outfile.display()))
            .arg("--log-level=warning");
        if options.sourcemap {
            cmd.arg("--sourcemap");
        }
        if options.minify {
            cmd.arg("--minify");
        }
        cmd
    }
}

impl ScriptBundler for EsbuildCli {
    fn bundle(&self, entry: &Path, outfile: &Path, options: &BundleOptions) -> Result<(), ToolError> {
        run(self.command(entry, outfile, options))
    }
}
