//! Typographic normalization for Russian and English text.
//!
//! Only character data is rewritten. Tags, attribute values and the contents
//! of `head`, `script`, `style`, `pre`, `code` and `textarea` are left alone.

use std::sync::LazyLock;

use regex::Regex;

use super::html::{tokenize, Token};
use super::{Transform, TransformError};

const NBSP: &str = "&nbsp;";

/// Elements whose text is never touched.
const PROTECTED: &[&str] = &["head", "script", "style", "pre", "code", "textarea"];

struct Rules {
    ellipsis: Regex,
    copyright: Regex,
    registered: Regex,
    trademark: Regex,
    space_before_punct: Regex,
    dash: Regex,
    quotes: Regex,
    short_word: Regex,
    number_unit: Regex,
    cyrillic: Regex,
}

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("typograf rule {pattern:?} is invalid: {err}"),
    }
}

static RULES: LazyLock<Rules> = LazyLock::new(|| Rules {
    ellipsis: compile(r"\.{3}"),
    copyright: compile(r"(?i)\(c\)"),
    registered: compile(r"(?i)\(r\)"),
    trademark: compile(r"(?i)\(tm\)"),
    space_before_punct: compile(r"(\S)[ \t]+([,.;:!?)»”])"),
    dash: compile(r"(\S)[ \t]+(?:-{1,2}|–|—)[ \t]+"),
    quotes: compile(r#""([^"]+)""#),
    short_word: compile(r"(^|[\s(«“]|&nbsp;)(\p{L}{1,2})[ \t]+(\S)"),
    number_unit: compile(r"(\d)[ \t]+(\p{L})"),
    cyrillic: compile(r"\p{Cyrillic}"),
});

/// Apply every rule to a run of plain text.
pub fn typografy_text(text: &str) -> String {
    let r = &*RULES;

    let text = r.ellipsis.replace_all(text, "…");
    let text = r.copyright.replace_all(&text, "©");
    let text = r.registered.replace_all(&text, "®");
    let text = r.trademark.replace_all(&text, "™");
    let text = r.space_before_punct.replace_all(&text, "$1$2");
    let text = r.dash.replace_all(&text, format!("${{1}}{}— ", NBSP).as_str());
    let text = r.quotes.replace_all(&text, |caps: &regex::Captures<'_>| {
        let inner = &caps[1];
        if r.cyrillic.is_match(inner) {
            format!("«{}»", inner)
        } else {
            format!("“{}”", inner)
        }
    });

    // each pass can expose a new short word right after an inserted &nbsp;
    let mut text = text.into_owned();
    loop {
        let next = r.short_word.replace_all(&text, format!("${{1}}${{2}}{}${{3}}", NBSP).as_str());
        if next == text {
            break;
        }
        text = next.into_owned();
    }

    r.number_unit.replace_all(&text, format!("${{1}}{}${{2}}", NBSP).as_str()).into_owned()
}

/// Typographer for rendered pages.
#[derive(Debug, Clone, Default)]
pub struct Typograf;

impl Typograf {
    /// Process a whole document.
    pub fn process(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len() + input.len() / 8);
        let mut protected: Vec<String> = Vec::new();

        for token in tokenize(input) {
            match token {
                Token::Text(text) if protected.is_empty() => out.push_str(&typografy_text(text)),
                Token::Text(text) | Token::Verbatim(text) => out.push_str(text),
                Token::Raw { content, .. } => out.push_str(content),
                Token::Open { name, raw, self_closing } => {
                    if !self_closing && PROTECTED.contains(&name.as_str()) {
                        protected.push(name);
                    }
                    out.push_str(raw);
                }
                Token::Close { name, raw } => {
                    if let Some(p) = protected.iter().rposition(|n| *n == name) {
                        protected.truncate(p);
                    }
                    out.push_str(raw);
                }
            }
        }
        out
    }
}

impl Transform for Typograf {
    fn name(&self) -> &'static str {
        "typograf"
    }

    fn apply(&self, input: String) -> Result<String, TransformError> {
        Ok(self.process(&input))
    }
}
