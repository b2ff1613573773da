//! Build context containing configuration and state for a build.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lightningcss::targets::Browsers;
use serde_json::json;

use crate::config::{resolve_under, SiteConfig};
use crate::env::BuildEnvironment;
use crate::reload::{NoopReload, ReloadNotifier, ReloadScope};
use crate::tools::Toolchain;
use crate::transforms::css::browsers_from_targets;

/// Everything a task needs to run.
///
/// The context is created once per process and shared read-only between
/// the initial build and the watcher.
pub struct BuildContext {
    /// The loaded configuration
    config: SiteConfig,
    /// Mode, content hash and output directory
    env: BuildEnvironment,
    /// Project root directory (where sitepipe.toml is located)
    project_root: PathBuf,
    /// External compilers
    tools: Toolchain,
    /// Live-reload sink
    reload: Arc<dyn ReloadNotifier>,
    /// Whether to run in verbose mode
    verbose: bool,
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("env", &self.env)
            .field("project_root", &self.project_root)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    /// Create a new build context.
    ///
    /// Reload signals are discarded until [`BuildContext::with_reload`] is used.
    pub fn new(
        config: SiteConfig,
        env: BuildEnvironment,
        project_root: PathBuf,
        tools: Toolchain,
    ) -> Self {
        Self { config, env, project_root, tools, reload: Arc::new(NoopReload), verbose: false }
    }

    /// Send reload signals to `reload`.
    pub fn with_reload(mut self, reload: Arc<dyn ReloadNotifier>) -> Self {
        self.reload = reload;
        self
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Get the build environment.
    pub fn env(&self) -> &BuildEnvironment {
        &self.env
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the external compilers.
    pub fn tools(&self) -> &Toolchain {
        &self.tools
    }

    /// Whether this is a production build.
    pub fn is_production(&self) -> bool {
        self.env.is_production()
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Signal connected browsers. A no-op in production.
    pub fn notify_reload(&self, scope: ReloadScope) {
        if !self.is_production() {
            self.reload.notify(scope);
        }
    }

    /// Resolve a configured path relative to the project root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        resolve_under(&self.project_root, path)
    }

    /// The output directory (resolved to absolute path).
    pub fn out_dir(&self) -> PathBuf {
        if self.env.output_dir.is_absolute() {
            self.env.output_dir.clone()
        } else {
            self.project_root.join(&self.env.output_dir)
        }
    }

    /// A subdirectory of the output directory.
    pub fn out_path(&self, subpath: impl AsRef<Path>) -> PathBuf {
        self.out_dir().join(subpath)
    }

    /// Browser targets for CSS prefixing.
    pub fn browsers(&self) -> Browsers {
        browsers_from_targets(&self.config.styles.targets)
    }

    /// Locals passed to a template named `view`.
    pub fn page_context(&self, view: &str) -> serde_json::Value {
        json!({
            "VIEW": view,
            "PRODUCTION": self.is_production(),
            "HASH": self.env.content_hash,
            "URL": self.env.base_url,
            "DOMAIN": self.env.domain,
        })
    }

    /// `name` with the content hash appended in production.
    ///
    /// `hashed_name("script", "js")` is `script-17000000.js` in production
    /// and `script.js` otherwise.
    pub fn hashed_name(&self, stem: &str, extension: &str) -> String {
        if self.is_production() {
            format!("{}-{}.{}", stem, self.env.content_hash, extension)
        } else {
            format!("{}.{}", stem, extension)
        }
    }
}
