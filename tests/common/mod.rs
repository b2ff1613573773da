//! Shared fixtures for integration tests.
//!
//! The external compilers are replaced with in-process fakes so a whole
//! site can be built without pug, sass or esbuild installed.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use tempfile::TempDir;

use sitepipe::build::BuildContext;
use sitepipe::config::{default_config, SiteConfig};
use sitepipe::env::BuildEnvironment;
use sitepipe::reload::{RecordingReload, ReloadNotifier};
use sitepipe::tools::{
    BundleOptions, ScriptBundler, StyleCompiler, TemplateRenderer, ToolError, Toolchain,
};

/// Clock reading used by every fixture; hashes to `17000000`.
pub const NOW_MILLIS: i64 = 1_700_000_000_000;

fn failed(program: &str) -> ToolError {
    ToolError::Failed {
        command: program.to_string(),
        status: "exit status: 1".to_string(),
        stderr: "fixture error".to_string(),
    }
}

/// Replaces `#{KEY}` with template locals.
pub struct FakePug;

impl TemplateRenderer for FakePug {
    fn render(
        &self,
        template: &Path,
        context: &serde_json::Value,
        _pretty: bool,
    ) -> Result<String, ToolError> {
        let mut doc = fs::read_to_string(template)?;
        if doc.contains("!error") {
            return Err(failed("pug"));
        }
        if let Some(locals) = context.as_object() {
            for (key, value) in locals {
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                doc = doc.replace(&format!("#{{{}}}", key), &text);
            }
        }
        Ok(doc)
    }
}

/// Passes CSS through, dropping `@import` lines.
pub struct FakeSass;

impl StyleCompiler for FakeSass {
    fn compile(&self, source: &str, _path: &Path) -> Result<String, ToolError> {
        if source.contains("!error") {
            return Err(failed("sass"));
        }
        Ok(source
            .lines()
            .filter(|l| !l.trim_start().starts_with("@import"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Copies the entry, writing a stub source map when asked to.
pub struct FakeEsbuild;

impl ScriptBundler for FakeEsbuild {
    fn bundle(&self, entry: &Path, outfile: &Path, options: &BundleOptions) -> Result<(), ToolError> {
        let source = fs::read_to_string(entry)?;
        if source.contains("!error") {
            return Err(failed("esbuild"));
        }
        let body = if options.minify {
            source.split_whitespace().collect::<Vec<_>>().join(" ")
        } else {
            source
        };
        fs::write(outfile, body)?;
        if options.sourcemap {
            fs::write(outfile.with_extension("js.map"), r#"{"version":3}"#)?;
        }
        Ok(())
    }
}

/// A site project in a temporary directory.
pub struct Site {
    pub dir: TempDir,
    pub config: SiteConfig,
    pub reload: Arc<RecordingReload>,
}

impl Site {
    /// An empty project with the default configuration.
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().expect("should create temp dir"),
            config: default_config(),
            reload: Arc::new(RecordingReload::new()),
        }
    }

    /// A project with one source for every task.
    pub fn landing() -> Self {
        let site = Self::empty();
        site.write("assets/fonts/roboto.woff2", "woff2");
        site.write("assets/styles/variables.sass", "$red: red");
        site.write("assets/styles/pages/main.sass", ".hero {\n  color: red;\n  display: flex;\n}\n");
        site.write("assets/scripts/app.js", "const menu = 1;\nconsole.log(menu);\n");
        site.write("assets/images/hero.jpg", "jpg-bytes");
        site.write(
            "assets/images/icons/phone.svg",
            "<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\">\n  <!-- icon -->\n  <path d=\"M0 0h1v1z\"/>\n</svg>\n",
        );
        site.write("assets/images/favicon/favicon.ico", "ico");
        site.write(
            "assets/views/pages/index.pug",
            "<!DOCTYPE html>\n<html>\n  <body>\n    <h1>#{DOMAIN}</h1>\n    <script src=\"statics/scripts/script.js\"></script>\n  </body>\n</html>\n",
        );
        site.write("assets/views/pages/_site-map.pug", "<ul><li><a href=\"index.html\">index</a></li></ul>");
        site.write("assets/views/pages/error.pug", "<h1>Страница не найдена</h1>");
        site.write("assets/files/.htaccess.pug", "ErrorDocument 404 /error.php\n");
        site.write("assets/files/robots.pug", "Sitemap: #{URL}sitemap.xml\n");
        site.write("assets/files/mail.php", "<?php echo 1;");
        site
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a project file, creating directories.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().expect("should have parent")).expect("should create dirs");
        fs::write(&path, contents).expect("should write fixture");
        path
    }

    /// Build context with fake compilers and a fixed clock.
    pub fn context(&self, mode: &str) -> BuildContext {
        let env = BuildEnvironment::resolve(Some(mode), NOW_MILLIS, &self.config);
        let tools = Toolchain::new(FakePug, FakeSass, FakeEsbuild);
        let reload: Arc<dyn ReloadNotifier> = self.reload.clone();
        BuildContext::new(self.config.clone(), env, self.root().to_path_buf(), tools)
            .with_reload(reload)
    }
}

/// Every file under `dir`, relative and sorted.
pub fn list_files(dir: &Path) -> Vec<String> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in fs::read_dir(dir).expect("should read dir").flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(base, &path, out);
            } else if let Ok(rel) = path.strip_prefix(base) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    let mut files = Vec::new();
    walk(dir, dir, &mut files);
    files.sort();
    files
}

/// SHA-256 over every relative path and file content under `dir`.
pub fn tree_digest(dir: &Path) -> String {
    let mut hasher = Sha256::new();
    for rel in list_files(dir) {
        hasher.update(rel.as_bytes());
        hasher.update([0]);
        hasher.update(fs::read(dir.join(&rel)).expect("should read output"));
        hasher.update([0]);
    }
    format!("{:x}", hasher.finalize())
}

/// Writer that keeps everything written to it.
#[derive(Clone, Default)]
pub struct Captured(pub Arc<Mutex<Vec<u8>>>);

impl Captured {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("should lock")).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("should lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
