//! Build environment resolution.
//!
//! The environment decides whether a run produces production or development
//! output, which content hash is appended to cache-busted filenames, and
//! where the output tree lives. It is resolved once per process and passed by
//! reference to every task.

use std::path::PathBuf;

use crate::config::SiteConfig;

/// Primary environment variable selecting the build mode.
pub const MODE_VAR: &str = "SITEPIPE_ENV";

/// Fallback variable, honoured so existing `NODE_ENV=production` scripts keep working.
pub const FALLBACK_MODE_VAR: &str = "NODE_ENV";

/// Value of the mode variable that selects production output.
pub const PRODUCTION_VALUE: &str = "production";

/// Number of leading digits of the millisecond timestamp used as content hash.
pub const HASH_LEN: usize = 8;

/// Build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Readable output, source maps, live reload
    Development,
    /// Minified, hash-suffixed output
    Production,
}

impl Mode {
    /// Interpret a raw mode value. Anything but `"production"` is development.
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            Some(PRODUCTION_VALUE) => Mode::Production,
            _ => Mode::Development,
        }
    }

    /// Name of the output directory for this mode.
    pub fn output_dir_name(self) -> &'static str {
        match self {
            Mode::Production => "build",
            Mode::Development => "dev",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Development => write!(f, "development"),
            Mode::Production => write!(f, "production"),
        }
    }
}

/// Immutable description of the current build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvironment {
    /// Development or production
    pub mode: Mode,
    /// Time-derived cache-busting suffix
    pub content_hash: String,
    /// Output directory, relative to the project root unless overridden
    pub output_dir: PathBuf,
    /// Absolute site URL, exposed to templates as `URL`
    pub base_url: String,
    /// Human-readable domain, exposed to templates as `DOMAIN`
    pub domain: String,
}

impl BuildEnvironment {
    /// Resolve an environment from an explicit mode value and clock reading.
    ///
    /// `now_millis` is milliseconds since the Unix epoch; its first
    /// [`HASH_LEN`] decimal digits become the content hash.
    pub fn resolve(mode_value: Option<&str>, now_millis: i64, site: &SiteConfig) -> Self {
        let mode = Mode::from_value(mode_value);
        Self {
            mode,
            content_hash: content_hash(now_millis),
            output_dir: PathBuf::from(mode.output_dir_name()),
            base_url: site.site.url.clone(),
            domain: site.site.domain.clone(),
        }
    }

    /// Resolve from the process environment and the wall clock.
    pub fn from_env(site: &SiteConfig) -> Self {
        let value = mode_from_process();
        Self::resolve(value.as_deref(), chrono::Utc::now().timestamp_millis(), site)
    }

    /// Like [`BuildEnvironment::from_env`], but uses `default_value` when
    /// neither mode variable is set.
    pub fn from_env_or(default_value: &str, site: &SiteConfig) -> Self {
        let value = mode_from_process().unwrap_or_else(|| default_value.to_string());
        Self::resolve(Some(&value), chrono::Utc::now().timestamp_millis(), site)
    }

    /// Replace the output directory (CLI `--out`).
    pub fn with_output_dir(mut self, output_dir: PathBuf) -> Self {
        self.output_dir = output_dir;
        self
    }

    /// Whether this is a production build.
    pub fn is_production(&self) -> bool {
        self.mode == Mode::Production
    }
}

/// Read the raw mode value, preferring [`MODE_VAR`] over [`FALLBACK_MODE_VAR`].
fn mode_from_process() -> Option<String> {
    std::env::var(MODE_VAR).ok().or_else(|| std::env::var(FALLBACK_MODE_VAR).ok())
}

/// First [`HASH_LEN`] digits of a millisecond timestamp.
pub fn content_hash(now_millis: i64) -> String {
    now_millis.to_string().chars().take(HASH_LEN).collect()
}
