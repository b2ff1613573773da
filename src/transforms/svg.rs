//! Lossless SVG cleanup.
//!
//! Removes markup that has no effect on rendering: the XML declaration,
//! doctype, comments, `<metadata>`, editor-specific elements and attributes,
//! and whitespace between tags outside `<text>` elements.

use std::sync::LazyLock;

use regex::Regex;

use super::{Transform, TransformError};

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("svg rule {pattern:?} is invalid: {err}"),
    }
}

/// Patterns whose matches are deleted outright, applied in order.
static REMOVALS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"<\?xml[^>]*\?>",
        r"(?s)<!DOCTYPE[^>\[]*(\[.*?\])?\s*>",
        r"(?s)<!--.*?-->",
        r"(?s)<metadata\b.*?</metadata>",
        r"(?s)<(sodipodi|inkscape):[\w-]+\b[^>]*/>",
        r"(?s)<(sodipodi|inkscape):([\w-]+)\b.*?</(sodipodi|inkscape):[\w-]+>",
        r#"\s+(sodipodi|inkscape):[\w-]+="[^"]*""#,
        r#"\s+xmlns:(sodipodi|inkscape)="[^"]*""#,
    ]
    .into_iter()
    .map(compile)
    .collect()
});

static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| compile(r">\s+<"));
static TEXT_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?s)<text\b[^>]*?(/>|>.*?</text\s*>)"));

/// Drop whitespace between tags, leaving `<text>` content untouched.
fn strip_between_tags(doc: &str) -> String {
    if doc.contains(r#"xml:space="preserve""#) {
        return doc.to_string();
    }

    let mut out = String::with_capacity(doc.len());
    let mut last = 0;
    for text in TEXT_ELEMENT.find_iter(doc) {
        push_outside_text(&mut out, &doc[last..text.start()], last > 0, true);
        out.push_str(text.as_str());
        last = text.end();
    }
    push_outside_text(&mut out, &doc[last..], last > 0, false);
    out
}

/// Strip one segment between text elements. The neighbouring text
/// element's brackets stand in as `>` and `<` so edge whitespace matches.
fn push_outside_text(out: &mut String, segment: &str, after_text: bool, before_text: bool) {
    let open = if after_text { ">" } else { "" };
    let close = if before_text { "<" } else { "" };
    let padded = format!("{}{}{}", open, segment, close);
    let stripped = BETWEEN_TAGS.replace_all(&padded, "><");
    out.push_str(&stripped[open.len()..stripped.len() - close.len()]);
}

/// Optimizer for `.svg` sources.
#[derive(Debug, Clone, Default)]
pub struct SvgOptimize;

impl SvgOptimize {
    /// Optimize a document.
    ///
    /// Text nodes with visible content are kept as written; only runs made
    /// entirely of whitespace between two tags are removed, and never inside
    /// `<text>` or under `xml:space="preserve"`.
    pub fn optimize(&self, input: &str) -> String {
        let mut doc = input.to_string();
        for pattern in REMOVALS.iter() {
            doc = pattern.replace_all(&doc, "").into_owned();
        }
        strip_between_tags(doc.trim())
    }
}

impl Transform for SvgOptimize {
    fn name(&self) -> &'static str {
        "svg"
    }

    fn apply(&self, input: String) -> Result<String, TransformError> {
        if !input.contains("<svg") {
            return Err(TransformError::Step {
                step: "svg",
                message: "document has no <svg> element".to_string(),
            });
        }
        Ok(self.optimize(&input))
    }
}
