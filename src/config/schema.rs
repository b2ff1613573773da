//! Configuration schema types for `sitepipe.toml`
//!
//! Defines the structure and validation rules for a site project. Every
//! section has defaults matching the conventional `assets/` layout, so an
//! empty file (or no file at all) describes a working project.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Site metadata exposed to templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSection {
    /// Project name, used in log output
    #[serde(default = "default_site_name")]
    pub name: String,
    /// Absolute site URL (`URL` in templates)
    #[serde(default = "default_site_url")]
    pub url: String,
    /// Display domain (`DOMAIN` in templates)
    #[serde(default = "default_site_domain")]
    pub domain: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self { name: default_site_name(), url: default_site_url(), domain: default_site_domain() }
    }
}

fn default_site_name() -> String {
    "site".to_string()
}

fn default_site_url() -> String {
    "https://example.com/".to_string()
}

fn default_site_domain() -> String {
    "example.com".to_string()
}

/// Font copy task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontsConfig {
    /// Glob of font files copied verbatim
    #[serde(default = "default_fonts_source")]
    pub source: String,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self { source: default_fonts_source() }
    }
}

fn default_fonts_source() -> String {
    "assets/fonts/*.*".to_string()
}

/// Stylesheet task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesConfig {
    /// Glob of stylesheet entry files
    #[serde(default = "default_styles_source")]
    pub source: String,
    /// Glob whose changes rebuild the styles
    #[serde(default = "default_styles_watch")]
    pub watch: String,
    /// Line prepended to every entry before compilation
    #[serde(default = "default_variables_import")]
    pub header: String,
    /// Minimum browser versions for vendor prefixing, e.g. `safari = "15.4"`
    #[serde(default = "default_browser_targets")]
    pub targets: BTreeMap<String, String>,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            source: default_styles_source(),
            watch: default_styles_watch(),
            header: default_variables_import(),
            targets: default_browser_targets(),
        }
    }
}

fn default_styles_source() -> String {
    "assets/styles/pages/*.sass".to_string()
}

fn default_styles_watch() -> String {
    "assets/styles/**/*.sass".to_string()
}

fn default_variables_import() -> String {
    "@import \"../variables\"\n".to_string()
}

/// Roughly "last 2 versions, > 0.7%" at the time of writing.
fn default_browser_targets() -> BTreeMap<String, String> {
    [
        ("chrome", "109"),
        ("edge", "120"),
        ("firefox", "115"),
        ("safari", "15.6"),
        ("ios_saf", "15.6"),
        ("samsung", "23"),
        ("opera", "105"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Script bundling task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    /// Single entry module
    #[serde(default = "default_scripts_entry")]
    pub entry: String,
    /// Glob whose changes rebuild the bundle
    #[serde(default = "default_scripts_watch")]
    pub watch: String,
    /// Syntax target passed to the bundler
    #[serde(default = "default_scripts_target")]
    pub target: String,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            entry: default_scripts_entry(),
            watch: default_scripts_watch(),
            target: default_scripts_target(),
        }
    }
}

fn default_scripts_entry() -> String {
    "assets/scripts/app.js".to_string()
}

fn default_scripts_watch() -> String {
    "assets/scripts/**/*.js".to_string()
}

fn default_scripts_target() -> String {
    "es2015".to_string()
}

/// Image, SVG and favicon task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Raster and icon files copied as-is
    #[serde(default = "default_images_raster")]
    pub raster: String,
    /// Vector files optimized before writing
    #[serde(default = "default_images_svg")]
    pub svg: String,
    /// Favicon copied to the output root
    #[serde(default = "default_favicon")]
    pub favicon: String,
    /// Glob whose changes rebuild the images
    #[serde(default = "default_images_watch")]
    pub watch: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            raster: default_images_raster(),
            svg: default_images_svg(),
            favicon: default_favicon(),
            watch: default_images_watch(),
        }
    }
}

fn default_images_raster() -> String {
    "assets/images/**/*.{png,jpg,ico,webp}".to_string()
}

fn default_images_svg() -> String {
    "assets/images/**/*.svg".to_string()
}

fn default_favicon() -> String {
    "assets/images/favicon/favicon.ico".to_string()
}

fn default_images_watch() -> String {
    "assets/images/**/*.{png,jpg,svg,ico,webp}".to_string()
}

/// Page template task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewsConfig {
    /// Glob of page templates
    #[serde(default = "default_views_pages")]
    pub pages: String,
    /// Glob whose changes re-render the pages
    #[serde(default = "default_views_watch")]
    pub watch: String,
    /// Page rendered as the server-side 404 document in production
    #[serde(default = "default_error_page")]
    pub error_page: String,
    /// Page rendered as `sitemap.xml` in production
    #[serde(default = "default_site_map")]
    pub site_map: String,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            pages: default_views_pages(),
            watch: default_views_watch(),
            error_page: default_error_page(),
            site_map: default_site_map(),
        }
    }
}

fn default_views_pages() -> String {
    "assets/views/pages/*.pug".to_string()
}

fn default_views_watch() -> String {
    "assets/views/**/*.pug".to_string()
}

fn default_error_page() -> String {
    "assets/views/pages/error.pug".to_string()
}

fn default_site_map() -> String {
    "assets/views/pages/_site-map.pug".to_string()
}

/// Server-side files task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Template rendered to `.htaccess`
    #[serde(default = "default_htaccess")]
    pub htaccess: String,
    /// Template rendered to `robots.txt`
    #[serde(default = "default_robots")]
    pub robots: String,
    /// Mail script copied unchanged
    #[serde(default = "default_mail_script")]
    pub mail_script: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            htaccess: default_htaccess(),
            robots: default_robots(),
            mail_script: default_mail_script(),
        }
    }
}

fn default_htaccess() -> String {
    "assets/files/.htaccess.pug".to_string()
}

fn default_robots() -> String {
    "assets/files/robots.pug".to_string()
}

fn default_mail_script() -> String {
    "assets/files/mail.php".to_string()
}

/// External compiler programs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Template compiler
    #[serde(default = "default_pug")]
    pub pug: String,
    /// Stylesheet compiler
    #[serde(default = "default_sass")]
    pub sass: String,
    /// Script bundler
    #[serde(default = "default_esbuild")]
    pub esbuild: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self { pug: default_pug(), sass: default_sass(), esbuild: default_esbuild() }
    }
}

fn default_pug() -> String {
    "pug".to_string()
}

fn default_sass() -> String {
    "sass".to_string()
}

fn default_esbuild() -> String {
    "esbuild".to_string()
}

/// Dev server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Page served at `/`
    #[serde(default = "default_index")]
    pub index: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), index: default_index() }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_index() -> String {
    "_site-map.html".to_string()
}

/// Contact-form relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Endpoint path receiving form posts
    #[serde(default = "default_relay_path")]
    pub path: String,
    /// Bind port for `sitepipe relay`
    #[serde(default = "default_relay_port")]
    pub port: u16,
    /// Addresses that receive every submission
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Sender address (also used for Reply-To)
    #[serde(default = "default_relay_from")]
    pub from: String,
    /// Landing name used in subject, heading and CRM payload; defaults to the site domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landing: Option<String>,
    /// CRM source identifier
    #[serde(default)]
    pub source_id: u32,
    /// CRM form endpoint; the CRM call is skipped when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crm_endpoint: Option<String>,
    /// Skip TLS certificate verification for the CRM call
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            path: default_relay_path(),
            port: default_relay_port(),
            recipients: vec![],
            from: default_relay_from(),
            landing: None,
            source_id: 0,
            crm_endpoint: None,
            accept_invalid_certs: false,
        }
    }
}

fn default_relay_path() -> String {
    "/mail.php".to_string()
}

fn default_relay_port() -> u16 {
    8080
}

fn default_relay_from() -> String {
    "no-reply@example.com".to_string()
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: false }
    }
}

/// Complete sitepipe.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site metadata
    #[serde(default)]
    pub site: SiteSection,
    /// Fonts task
    #[serde(default)]
    pub fonts: FontsConfig,
    /// Styles task
    #[serde(default)]
    pub styles: StylesConfig,
    /// Scripts task
    #[serde(default)]
    pub scripts: ScriptsConfig,
    /// Images task
    #[serde(default)]
    pub images: ImagesConfig,
    /// Templates task
    #[serde(default)]
    pub views: ViewsConfig,
    /// Server-side files task
    #[serde(default)]
    pub files: FilesConfig,
    /// External programs
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Dev server
    #[serde(default)]
    pub server: ServerConfig,
    /// Mail relay
    #[serde(default)]
    pub relay: RelayConfig,
    /// Watch mode
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "server.port")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sitepipe.toml: '{}' {}", self.field, self.message)
    }
}

impl SiteConfig {
    /// Validate the configuration, returning every problem found.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: &str| {
            errors.push(ConfigValidationError {
                field: field.to_string(),
                message: message.to_string(),
            });
        };

        if self.site.url.is_empty() {
            push("site.url", "must be a non-empty URL");
        }

        let globs = [
            ("fonts.source", &self.fonts.source),
            ("styles.source", &self.styles.source),
            ("styles.watch", &self.styles.watch),
            ("scripts.entry", &self.scripts.entry),
            ("scripts.watch", &self.scripts.watch),
            ("images.raster", &self.images.raster),
            ("images.svg", &self.images.svg),
            ("images.watch", &self.images.watch),
            ("views.pages", &self.views.pages),
            ("views.watch", &self.views.watch),
        ];
        for (field, pattern) in globs {
            if pattern.trim().is_empty() {
                push(field, "must be a non-empty glob pattern");
            }
        }

        for (browser, version) in &self.styles.targets {
            if crate::transforms::css::parse_browser_version(version).is_none() {
                errors.push(ConfigValidationError {
                    field: format!("styles.targets.{}", browser),
                    message: format!("'{}' is not a version like \"15\" or \"15.4\"", version),
                });
            }
            if !crate::transforms::css::is_known_browser(browser) {
                errors.push(ConfigValidationError {
                    field: format!("styles.targets.{}", browser),
                    message: "is not a known browser".to_string(),
                });
            }
        }

        if !self.relay.path.starts_with('/') {
            errors.push(ConfigValidationError {
                field: "relay.path".to_string(),
                message: "must start with '/'".to_string(),
            });
        }

        if self.watch.debounce_ms == 0 {
            errors.push(ConfigValidationError {
                field: "watch.debounce_ms".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        errors
    }

    /// Landing name used by the relay.
    pub fn landing(&self) -> &str {
        self.relay.landing.as_deref().unwrap_or(&self.site.domain)
    }
}

/// Resolve a configured path relative to a project root.
pub fn resolve_under(root: &std::path::Path, path: &str) -> PathBuf {
    let path = std::path::Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
