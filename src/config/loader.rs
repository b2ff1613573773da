//! Configuration loading and discovery for `sitepipe.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::SiteConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "sitepipe.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse sitepipe.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override dev server port
    pub port: Option<u16>,
    /// Override dev server bind address
    pub host: Option<String>,
}

/// A loaded configuration together with the directory it applies to.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Parsed configuration
    pub config: SiteConfig,
    /// Directory containing sitepipe.toml, or the working directory
    pub project_root: PathBuf,
    /// Path of the file that was read, if any
    pub source: Option<PathBuf>,
}

/// Find sitepipe.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find sitepipe.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a sitepipe.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns a default
/// configuration.
pub fn load_config(path: Option<&Path>) -> Result<SiteConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

/// Load configuration and work out the project root it belongs to.
///
/// The project root is the directory holding the config file; without a
/// file it is the current working directory.
pub fn load_project(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let source = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    let config = match &source {
        Some(p) => load_config_file(p)?,
        None => default_config(),
    };

    let project_root = source
        .as_deref()
        .and_then(project_root)
        .map(Path::to_path_buf)
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(env::current_dir, Ok)?;

    Ok(LoadedConfig { config, project_root, source })
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<SiteConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: SiteConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Create a default configuration when no sitepipe.toml is found.
///
/// The site name is taken from the current directory name.
pub fn default_config() -> SiteConfig {
    let mut config = SiteConfig::default();
    if let Some(name) = env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
    {
        config.site.name = name;
    }
    config
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut SiteConfig, overrides: &CliOverrides) {
    if let Some(port) = overrides.port {
        config.server.port = port;
    }

    if let Some(ref host) = overrides.host {
        config.server.host = host.clone();
    }
}

/// Get the project root directory from a config file path.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"[site]\nname = \"test\"")
            .expect("should write config content");

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"[site]\nname = \"test\"")
            .expect("should write config content");

        let subdir = temp.path().join("assets").join("styles");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, None);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(
                br#"
[site]
name = "landing"
url = "https://landing.test/"

[server]
port = 4000

[views]
pages = "templates/*.pug"
"#,
            )
            .expect("should write config content");

        let config = load_config(Some(&config_path)).expect("should load valid config");
        assert_eq!(config.site.name, "landing");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.views.pages, "templates/*.pug");
        assert_eq!(config.views.watch, "assets/views/**/*.pug");
    }

    #[test]
    fn test_load_project_root_is_config_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE);
        fs::write(&config_path, "").expect("should write config");

        let loaded = load_project(Some(&config_path)).expect("should load project");
        assert_eq!(loaded.project_root, temp.path());
        assert_eq!(loaded.source, Some(config_path));
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join("nonexistent.toml");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE);
        fs::write(&config_path, "this is not valid toml {{{").expect("should write config");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE);
        fs::write(&config_path, "[relay]\npath = \"mail.php\"\n").expect("should write config");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_merge_cli_overrides() {
        let mut config = default_config();
        let overrides =
            CliOverrides { port: Some(9000), host: Some("0.0.0.0".to_string()) };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_merge_cli_overrides_empty_keeps_config() {
        let mut config = default_config();
        merge_cli_overrides(&mut config, &CliOverrides::default());
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_project_root() {
        let config_path = Path::new("/project/sitepipe.toml");
        assert_eq!(project_root(config_path), Some(Path::new("/project")));
    }
}
