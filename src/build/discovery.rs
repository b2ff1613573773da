//! Source file discovery for the build system.
//!
//! Globs are resolved against the project root. Brace alternatives such as
//! `*.{png,jpg}` are expanded before matching, since the `glob` crate does
//! not support them.

use glob::{glob, MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Error during source discovery.
#[derive(Debug)]
pub enum DiscoveryError {
    /// Invalid glob pattern
    InvalidPattern(String, glob::PatternError),
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryError::InvalidPattern(pattern, err) => {
                write!(f, "Invalid glob pattern '{}': {}", pattern, err)
            }
        }
    }
}

impl std::error::Error for DiscoveryError {}

/// Expand the first `{a,b}` group of `pattern`, recursively.
///
/// `a/*.{png,jpg}` becomes `a/*.png` and `a/*.jpg`. Patterns without
/// braces (or with an unbalanced `{`) are returned unchanged.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, c) in pattern[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(open + i),
            _ => {}
        }
    }

    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| expand_braces(&format!("{}{}{}", prefix, &pattern[w[0] + 1..w[1]], suffix)))
        .collect()
}

/// The leading directories of `pattern` that contain no wildcards.
///
/// Matches keep their path relative to this base when copied, so
/// `assets/images/**/*.png` writes `assets/images/icons/a.png` as
/// `icons/a.png`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);
    let mut base = PathBuf::new();
    let components: Vec<Component<'_>> = path.components().collect();
    for (i, component) in components.iter().enumerate() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains(['*', '?', '[', '{']) || i + 1 == components.len() {
            break;
        }
        base.push(component);
    }
    base
}

/// Join a project root and a pattern, escaping glob syntax in the root.
fn rooted_pattern(base_dir: &Path, pattern: &str) -> String {
    if Path::new(pattern).is_absolute() {
        return pattern.to_string();
    }
    let root = Pattern::escape(&base_dir.to_string_lossy());
    format!("{}/{}", root.trim_end_matches('/'), pattern)
}

/// Discover files matching a glob pattern.
///
/// # Arguments
/// - `base_dir` - Base directory to resolve patterns from
/// - `pattern` - Glob pattern to match, with optional `{a,b}` groups
///
/// # Returns
/// Sorted, deduplicated list of matching files.
pub fn discover_files(base_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut files = BTreeSet::new();

    for expanded in expand_braces(pattern) {
        let full = rooted_pattern(base_dir, &expanded);
        let paths = glob(&full).map_err(|e| DiscoveryError::InvalidPattern(pattern.to_string(), e))?;

        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => {
                    files.insert(path);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("error reading path: {}", e),
            }
        }
    }

    Ok(files.into_iter().collect())
}

/// Path of `file` relative to the base of the glob that found it.
pub fn relative_to_glob(file: &Path, base_dir: &Path, pattern: &str) -> PathBuf {
    let base = base_dir.join(glob_base(pattern));
    match file.strip_prefix(&base) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => file.file_name().map(PathBuf::from).unwrap_or_default(),
    }
}

/// Compiled glob used to test paths reported by the file watcher.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    patterns: Vec<Pattern>,
}

impl GlobMatcher {
    /// Compile `pattern` rooted at `base_dir`.
    pub fn new(base_dir: &Path, pattern: &str) -> Result<Self, DiscoveryError> {
        let patterns = expand_braces(pattern)
            .iter()
            .map(|p| {
                Pattern::new(&rooted_pattern(base_dir, p))
                    .map_err(|e| DiscoveryError::InvalidPattern(pattern.to_string(), e))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether `path` matches any alternative.
    pub fn matches(&self, path: &Path) -> bool {
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.patterns.iter().any(|p| p.matches_path_with(path, options))
    }
}
