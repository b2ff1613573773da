//! Stylesheet post-processing with lightningcss.
//!
//! Compiled CSS goes through three steps in one parse: media query grouping,
//! vendor prefixing for the configured browser targets, and minification.
//! Development builds print the result pretty instead of minified.

use std::collections::BTreeMap;

use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;

use super::{Transform, TransformError};

const KNOWN_BROWSERS: &[&str] =
    &["android", "chrome", "edge", "firefox", "ie", "ios_saf", "opera", "safari", "samsung"];

/// Whether `name` is a browser key understood by [`browsers_from_targets`].
pub fn is_known_browser(name: &str) -> bool {
    KNOWN_BROWSERS.contains(&name)
}

/// Parse `"15"`, `"15.4"` or `"15.4.1"` into lightningcss' packed version.
pub fn parse_browser_version(version: &str) -> Option<u32> {
    let mut parts = version.trim().split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    let patch: u32 = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    if parts.next().is_some() || major > 0xFFFF || minor > 0xFF || patch > 0xFF {
        return None;
    }
    Some((major << 16) | (minor << 8) | patch)
}

/// Build lightningcss browser targets from `browser -> version` pairs.
///
/// Unknown browsers and malformed versions are ignored; config validation
/// reports them before a build starts.
pub fn browsers_from_targets(targets: &BTreeMap<String, String>) -> Browsers {
    let mut browsers = Browsers::default();
    for (name, version) in targets {
        let Some(version) = parse_browser_version(version) else {
            continue;
        };
        let slot = match name.as_str() {
            "android" => &mut browsers.android,
            "chrome" => &mut browsers.chrome,
            "edge" => &mut browsers.edge,
            "firefox" => &mut browsers.firefox,
            "ie" => &mut browsers.ie,
            "ios_saf" => &mut browsers.ios_saf,
            "opera" => &mut browsers.opera,
            "safari" => &mut browsers.safari,
            "samsung" => &mut browsers.samsung,
            _ => continue,
        };
        *slot = Some(version);
    }
    browsers
}

/// Merge identical top-level `@media` blocks and move them to the end.
///
/// Groups keep the order in which their query first appeared.
fn group_media_queries(sheet: &mut StyleSheet<'_>) -> Result<(), TransformError> {
    let rules = std::mem::take(&mut sheet.rules.0);
    let mut plain = Vec::with_capacity(rules.len());
    let mut groups: Vec<(String, CssRule<'_>)> = Vec::new();

    for rule in rules {
        match rule {
            CssRule::Media(media) => {
                let key = media
                    .query
                    .to_css_string(PrinterOptions::default())
                    .map_err(|e| TransformError::Css(e.to_string()))?;
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, CssRule::Media(existing))) => existing.rules.0.extend(media.rules.0),
                    _ => groups.push((key, CssRule::Media(media))),
                }
            }
            other => plain.push(other),
        }
    }

    plain.extend(groups.into_iter().map(|(_, rule)| rule));
    sheet.rules.0 = plain;
    Ok(())
}

/// Group media queries, prefix and minify (or pretty-print) a stylesheet.
pub fn optimize_css(
    source: &str,
    filename: &str,
    browsers: Browsers,
    minify: bool,
) -> Result<String, TransformError> {
    let options = ParserOptions { filename: filename.to_string(), ..ParserOptions::default() };
    let mut sheet =
        StyleSheet::parse(source, options).map_err(|e| TransformError::Css(e.to_string()))?;

    group_media_queries(&mut sheet)?;

    let targets = Targets::from(browsers);
    sheet
        .minify(MinifyOptions { targets, ..MinifyOptions::default() })
        .map_err(|e| TransformError::Css(e.to_string()))?;

    let printed = sheet
        .to_css(PrinterOptions { minify, targets, ..PrinterOptions::default() })
        .map_err(|e| TransformError::Css(e.to_string()))?;

    Ok(printed.code)
}

/// Transform step wrapping [`optimize_css`].
#[derive(Debug, Clone)]
pub struct CssOptimize {
    browsers: Browsers,
    minify: bool,
    filename: String,
}

impl CssOptimize {
    /// Create a step for the given targets; `minify` selects compact output.
    pub fn new(browsers: Browsers, minify: bool) -> Self {
        Self { browsers, minify, filename: String::new() }
    }

    /// Name reported in parse errors.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }
}

impl Transform for CssOptimize {
    fn name(&self) -> &'static str {
        "css"
    }

    fn apply(&self, input: String) -> Result<String, TransformError> {
        optimize_css(&input, &self.filename, self.browsers, self.minify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn safari(version: &str) -> Browsers {
        let mut targets = BTreeMap::new();
        targets.insert("safari".to_string(), version.to_string());
        browsers_from_targets(&targets)
    }

    #[test]
    fn test_parse_browser_version() {
        assert_eq!(parse_browser_version("15"), Some(15 << 16));
        assert_eq!(parse_browser_version("15.4"), Some((15 << 16) | (4 << 8)));
        assert_eq!(parse_browser_version("15.4.1"), Some((15 << 16) | (4 << 8) | 1));
        assert_eq!(parse_browser_version("fifteen"), None);
        assert_eq!(parse_browser_version("1.2.3.4"), None);
        assert_eq!(parse_browser_version(""), None);
    }

    #[test]
    fn test_browsers_from_targets_ignores_unknown() {
        let mut targets = BTreeMap::new();
        targets.insert("chrome".to_string(), "109".to_string());
        targets.insert("netscape".to_string(), "4".to_string());
        targets.insert("firefox".to_string(), "bad".to_string());

        let browsers = browsers_from_targets(&targets);
        assert_eq!(browsers.chrome, Some(109 << 16));
        assert_eq!(browsers.firefox, None);
    }

    #[test]
    fn test_minified_output_is_compact() {
        let css = ".a {\n  color: red;\n}\n\n.b {\n  margin: 0px;\n}\n";
        let out = optimize_css(css, "a.css", Browsers::default(), true).unwrap();
        assert!(!out.contains('\n'));
        assert!(out.contains(".a{color:red}"));
    }

    #[test]
    fn test_pretty_output_keeps_newlines() {
        let css = ".a{color:red}.b{color:blue}";
        let out = optimize_css(css, "a.css", Browsers::default(), false).unwrap();
        assert!(out.contains('\n'));
        assert!(out.contains("  color: red"));
    }

    #[test]
    fn test_vendor_prefixes_for_old_targets() {
        let css = ".a { user-select: none; }";
        let out = optimize_css(css, "a.css", safari("14"), true).unwrap();
        assert!(out.contains("-webkit-user-select:none"), "got {}", out);
    }

    #[test]
    fn test_media_queries_grouped_at_end() {
        let css = r#"
.a { color: red; }
@media (min-width: 768px) { .a { color: blue; } }
.b { color: green; }
@media (min-width: 768px) { .b { color: black; } }
"#;
        let out = optimize_css(css, "a.css", Browsers::default(), true).unwrap();
        assert_eq!(out.matches("@media").count(), 1, "got {}", out);

        let media = out.find("@media").unwrap();
        let green = out.find("color:green").unwrap();
        assert!(green < media, "plain rules should precede grouped media: {}", out);
    }

    #[test]
    fn test_distinct_queries_stay_separate() {
        let css = "@media (min-width: 1px){.a{color:red}} @media (min-width: 2px){.b{color:red}}";
        let out = optimize_css(css, "a.css", Browsers::default(), true).unwrap();
        assert_eq!(out.matches("@media").count(), 2);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = optimize_css("..a { color: red }", "broken.css", Browsers::default(), true)
            .unwrap_err();
        assert!(matches!(err, TransformError::Css(_)));
    }

    #[test]
    fn test_css_optimize_step() {
        let step = CssOptimize::new(Browsers::default(), true).with_filename("main.css");
        assert_eq!(step.name(), "css");
        assert_eq!(step.apply(".a { color: red }".to_string()).unwrap(), ".a{color:red}");
    }
}
