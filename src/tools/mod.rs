//! External compilers.
//!
//! Template rendering, stylesheet compilation and script bundling are done by
//! their usual command-line programs. Each one sits behind a small trait so
//! tasks can be exercised with in-process fakes, and [`Toolchain`] bundles
//! the three implementations a build uses.

pub mod esbuild;
pub mod pug;
pub mod sass;

use std::io::Write;
use std::process::{Command, Stdio};

use thiserror::Error;

pub use esbuild::{BundleOptions, EsbuildCli, ScriptBundler};
pub use pug::{PugCli, TemplateRenderer};
pub use sass::{SassCli, StyleCompiler};

use crate::config::ToolsConfig;

/// Error from running an external compiler.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be started
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The program ran and reported an error
    #[error("`{command}` failed ({status}):\n{stderr}")]
    Failed {
        /// Command line that was run
        command: String,
        /// Exit status description
        status: String,
        /// Captured diagnostics
        stderr: String,
    },
    /// Output was not valid UTF-8
    #[error("`{program}` produced non-UTF-8 output")]
    Encoding {
        /// Program name
        program: String,
    },
    /// I/O error while talking to the program
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render a command line for log output, quoting arguments with spaces.
pub fn command_string(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|arg| match arg.to_string_lossy() {
            arg if arg.contains(' ') => format!("'{arg}'"),
            arg => arg.into_owned(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `command`, feeding `input` on stdin, and return its stdout.
pub(crate) fn run_with_stdin(mut command: Command, input: &str) -> Result<String, ToolError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let line = command_string(&command);
    tracing::debug!(command = %line, "running");

    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ToolError::Spawn { program: program.clone(), source })?;

    // the child may fill stdout before it has read all of stdin
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_string();
        std::thread::spawn(move || stdin.write_all(input.as_bytes()))
    });

    let output = child.wait_with_output()?;
    if let Some(writer) = writer {
        match writer.join() {
            Ok(result) => {
                // broken pipe from an early exit is reported through the exit status
                if let Err(e) = result {
                    if output.status.success() {
                        return Err(ToolError::Io(e));
                    }
                }
            }
            Err(_) => return Err(ToolError::Io(std::io::Error::other("stdin writer panicked"))),
        }
    }

    check_status(&line, &output)?;
    String::from_utf8(output.stdout).map_err(|_| ToolError::Encoding { program })
}

/// Run `command` to completion, discarding stdout.
pub(crate) fn run(mut command: Command) -> Result<(), ToolError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let line = command_string(&command);
    tracing::debug!(command = %line, "running");

    let output = command
        .stdin(Stdio::null())
        .output()
        .map_err(|source| ToolError::Spawn { program, source })?;
    check_status(&line, &output)
}

fn check_status(line: &str, output: &std::process::Output) -> Result<(), ToolError> {
    if output.status.success() {
        return Ok(());
    }
    Err(ToolError::Failed {
        command: line.to_string(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// The external programs a build uses.
pub struct Toolchain {
    /// Page and server-file templates
    pub templates: Box<dyn TemplateRenderer>,
    /// Stylesheets
    pub styles: Box<dyn StyleCompiler>,
    /// Script bundle
    pub scripts: Box<dyn ScriptBundler>,
}

impl Toolchain {
    /// Command-line programs named in `[tools]`.
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self {
            templates: Box::new(PugCli::new(&config.pug)),
            styles: Box::new(SassCli::new(&config.sass)),
            scripts: Box::new(EsbuildCli::new(&config.esbuild)),
        }
    }

    /// Assemble a toolchain from explicit implementations.
    pub fn new(
        templates: impl TemplateRenderer + 'static,
        styles: impl StyleCompiler + 'static,
        scripts: impl ScriptBundler + 'static,
    ) -> Self {
        Self { templates: Box::new(templates), styles: Box::new(styles), scripts: Box::new(scripts) }
    }
}

impl std::fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolchain").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_string_quotes_spaces() {
        let mut cmd = Command::new("sass");
        cmd.arg("--load-path=/my dir").arg("--stdin");
        assert_eq!(command_string(&cmd), "sass '--load-path=/my dir' --stdin");
    }

    #[test]
    fn test_spawn_error_names_program() {
        let cmd = Command::new("sitepipe-definitely-not-installed");
        let err = run_with_stdin(cmd, "").unwrap_err();
        assert!(matches!(err, ToolError::Spawn { ref program, .. } if program == "sitepipe-definitely-not-installed"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_stdin_echoes() {
        let out = run_with_stdin(Command::new("cat"), "hello\n").expect("cat should run");
        assert_eq!(out, "hello\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_status_captures_stderr() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo broken >&2; exit 3");
        let err = run(cmd).unwrap_err();
        match err {
            ToolError::Failed { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
