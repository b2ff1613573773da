//! HTML minification and pretty-printing.
//!
//! Both passes share a small tokenizer that understands just enough HTML to
//! leave the contents of `script`, `style`, `pre` and `textarea` untouched:
//! tags are recognised, quoted attribute values may contain `>`, and
//! comments, doctypes and `<?...?>` instructions pass through verbatim.

use lightningcss::targets::Browsers;

use super::css::optimize_css;
use super::{Transform, TransformError};

/// Elements whose content is never reflowed or tokenized.
const RAW_ELEMENTS: &[&str] = &["script", "style", "pre", "textarea"];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements kept on the current line when formatting.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "acronym", "b", "bdi", "bdo", "big", "br", "button", "cite", "code", "data",
    "datalist", "del", "dfn", "em", "embed", "i", "iframe", "img", "input", "ins", "kbd", "label",
    "map", "mark", "math", "meter", "noscript", "object", "output", "progress", "q", "ruby", "s",
    "samp", "select", "small", "span", "strike", "strong", "sub", "sup", "svg", "template",
    "textarea", "time", "tt", "u", "var", "video", "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// Character data between tags
    Text(&'a str),
    /// Opening (or self-closing) tag
    Open { name: String, raw: &'a str, self_closing: bool },
    /// Closing tag
    Close { name: String, raw: &'a str },
    /// Comment, doctype or processing instruction
    Verbatim(&'a str),
    /// Unparsed body of a raw element
    Raw { parent: String, content: &'a str },
}

impl Token<'_> {
    fn raw(&self) -> &str {
        match self {
            Token::Text(s) | Token::Verbatim(s) => s,
            Token::Open { raw, .. } | Token::Close { raw, .. } => raw,
            Token::Raw { content, .. } => content,
        }
    }
}

/// Split a document into tokens. Concatenating every token's source text
/// reproduces the input exactly.
pub(crate) fn tokenize(input: &str) -> Vec<Token<'_>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }

        let Some((token, end)) = markup_at(input, pos) else {
            pos += 1;
            continue;
        };

        if text_start < pos {
            tokens.push(Token::Text(&input[text_start..pos]));
        }

        let raw_parent = match &token {
            Token::Open { name, self_closing: false, .. } if RAW_ELEMENTS.contains(&name.as_str()) => {
                Some(name.clone())
            }
            _ => None,
        };
        tokens.push(token);
        pos = end;

        if let Some(parent) = raw_parent {
            let close = find_closing_tag(input, pos, &parent).unwrap_or(input.len());
            if close > pos {
                tokens.push(Token::Raw { parent, content: &input[pos..close] });
            }
            pos = close;
        }
        text_start = pos;
    }

    if text_start < input.len() {
        tokens.push(Token::Text(&input[text_start..]));
    }
    tokens
}

/// Recognise markup starting at `pos` (which holds `<`).
fn markup_at(input: &str, pos: usize) -> Option<(Token<'_>, usize)> {
    let rest = &input[pos..];

    if rest.starts_with("<!--") {
        let end = rest.find("-->").map_or(input.len(), |i| pos + i + 3);
        return Some((Token::Verbatim(&input[pos..end]), end));
    }
    if rest.starts_with("<?") {
        let end = rest.find("?>").map_or(input.len(), |i| pos + i + 2);
        return Some((Token::Verbatim(&input[pos..end]), end));
    }
    if rest.starts_with("<!") {
        let end = pos + rest.find('>')? + 1;
        return Some((Token::Verbatim(&input[pos..end]), end));
    }

    let closing = rest.as_bytes().get(1) == Some(&b'/');
    let name_start = if closing { 2 } else { 1 };
    if !rest.as_bytes().get(name_start).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }

    let end = pos + tag_end(&rest[name_start..])? + name_start;
    let raw = &input[pos..end];
    let name: String = rest[name_start..]
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '/' && *c != '>')
        .collect::<String>()
        .to_ascii_lowercase();

    let token = if closing {
        Token::Close { name, raw }
    } else {
        let self_closing = raw.ends_with("/>");
        Token::Open { name, raw, self_closing }
    };
    Some((token, end))
}

/// Offset just past the `>` ending a tag, skipping quoted attribute values.
fn tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(i + 1),
            None => {}
        }
    }
    None
}

fn find_closing_tag(input: &str, from: usize, name: &str) -> Option<usize> {
    let needle = format!("</{}", name);
    let haystack = input[from..].to_ascii_lowercase();
    let mut offset = 0;
    while let Some(i) = haystack[offset..].find(&needle) {
        let at = offset + i;
        let after = haystack.as_bytes().get(at + needle.len());
        if after.map_or(true, |b| b.is_ascii_whitespace() || *b == b'>') {
            return Some(from + at);
        }
        offset = at + needle.len();
    }
    None
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn is_script_open(token: Option<&Token<'_>>) -> bool {
    let Some(Token::Open { raw, .. }) = token else {
        return false;
    };
    let lower = raw.to_ascii_lowercase();
    match lower.find("type=") {
        None => true,
        Some(i) => {
            let value = lower[i + 5..].trim_start_matches(['"', '\'']);
            value.starts_with("text/javascript")
                || value.starts_with("module")
                || value.starts_with("application/javascript")
        }
    }
}

/// Whether line breaks or indentation in `source` can be part of a string
/// value: template literals and backslash line continuations.
fn has_multiline_literal(source: &str) -> bool {
    source.contains('`') || source.lines().any(|l| l.trim_end().ends_with('\\'))
}

/// Drop blank lines and surrounding indentation from inline script.
fn compact_script(source: &str) -> String {
    if has_multiline_literal(source) {
        return source.to_string();
    }
    source.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join("\n")
}

/// Conservative HTML minifier.
///
/// Whitespace runs in text collapse to a single space (never removed
/// entirely), inline `<style>` blocks are minified as CSS and inline
/// JavaScript is compacted line by line. Comments, doctypes and tag markup
/// are kept as written.
#[derive(Debug, Clone, Default)]
pub struct HtmlMinify {
    browsers: Browsers,
}

impl HtmlMinify {
    /// Minifier using `browsers` as targets for inline CSS.
    pub fn new(browsers: Browsers) -> Self {
        Self { browsers }
    }

    /// Minify a document.
    pub fn minify(&self, input: &str) -> String {
        let tokens = tokenize(input);
        let mut out = String::with_capacity(input.len());

        for (i, token) in tokens.iter().enumerate() {
            match token {
                Token::Text(text) => out.push_str(&collapse_whitespace(text)),
                Token::Raw { parent, content } if parent == "style" => {
                    match optimize_css(content, "inline style", self.browsers, true) {
                        Ok(css) => out.push_str(&css),
                        Err(e) => {
                            tracing::warn!(error = %e, "leaving inline style unminified");
                            out.push_str(content);
                        }
                    }
                }
                Token::Raw { parent, content }
                    if parent == "script" && is_script_open(i.checked_sub(1).and_then(|p| tokens.get(p))) =>
                {
                    out.push_str(&compact_script(content));
                }
                other => out.push_str(other.raw()),
            }
        }

        out.trim().to_string()
    }
}

impl Transform for HtmlMinify {
    fn name(&self) -> &'static str {
        "html-minify"
    }

    fn apply(&self, input: String) -> Result<String, TransformError> {
        Ok(self.minify(&input))
    }
}

/// Pretty-printer for development output.
///
/// Block-level elements start on their own line, indented by nesting depth.
/// Inline elements and text stay on the line of their enclosing block.
#[derive(Debug, Clone)]
pub struct HtmlFormat {
    indent: String,
}

impl Default for HtmlFormat {
    fn default() -> Self {
        Self { indent: "  ".to_string() }
    }
}

struct Frame {
    name: String,
    has_block_child: bool,
}

impl HtmlFormat {
    /// Formatter indenting with `width` spaces per level.
    pub fn with_indent(width: usize) -> Self {
        Self { indent: " ".repeat(width) }
    }

    /// Format a document.
    pub fn format(&self, input: &str) -> String {
        let tokens = tokenize(input);
        let mut out = String::with_capacity(input.len() * 2);
        let mut stack: Vec<Frame> = Vec::new();
        // set after a block boundary so following text drops its leading space
        let mut at_boundary = true;

        for (i, token) in tokens.iter().enumerate() {
            let next_is_block = tokens.get(i + 1).is_some_and(starts_block);
            match token {
                Token::Text(text) => {
                    let mut text = collapse_whitespace(text);
                    if at_boundary {
                        text = text.trim_start().to_string();
                    }
                    if next_is_block || i + 1 == tokens.len() {
                        text = text.trim_end().to_string();
                    }
                    if !text.is_empty() {
                        out.push_str(&text);
                        at_boundary = false;
                    }
                }
                Token::Verbatim(raw) => {
                    self.newline(&mut out, stack.len());
                    out.push_str(raw);
                    mark_block_child(&mut stack);
                    at_boundary = true;
                }
                Token::Open { name, raw, self_closing } => {
                    if is_inline(name) {
                        out.push_str(raw);
                        at_boundary = false;
                        if !self_closing && !is_void(name) {
                            stack.push(Frame { name: name.clone(), has_block_child: false });
                        }
                        continue;
                    }
                    self.newline(&mut out, stack.len());
                    out.push_str(raw);
                    mark_block_child(&mut stack);
                    if !self_closing && !is_void(name) {
                        stack.push(Frame { name: name.clone(), has_block_child: false });
                    }
                    at_boundary = true;
                }
                Token::Close { name, raw } => {
                    let position = stack.iter().rposition(|f| f.name == *name);
                    let frame = position.map(|p| {
                        let mut popped = stack.split_off(p);
                        popped.swap_remove(0)
                    });
                    if frame.as_ref().is_some_and(|f| f.has_block_child) {
                        self.newline(&mut out, stack.len());
                    }
                    out.push_str(raw);
                    at_boundary = !is_inline(name);
                }
                Token::Raw { parent, content } => {
                    if parent == "pre" || parent == "textarea" || has_multiline_literal(content) {
                        out.push_str(content);
                        continue;
                    }
                    let body = content.trim_matches(|c: char| c == '\n' || c == '\r');
                    if body.trim().is_empty() {
                        continue;
                    }
                    let depth = stack.len();
                    for line in reindent(body) {
                        self.newline(&mut out, depth);
                        out.push_str(&line);
                    }
                    mark_block_child(&mut stack);
                }
            }
        }

        let mut out = out.trim_end().to_string();
        out.push('\n');
        out
    }

    fn newline(&self, out: &mut String, depth: usize) {
        let trimmed = out.trim_end_matches([' ', '\t']).len();
        out.truncate(trimmed);
        if !out.is_empty() {
            out.push('\n');
        }
        for _ in 0..depth {
            out.push_str(&self.indent);
        }
    }
}

impl Transform for HtmlFormat {
    fn name(&self) -> &'static str {
        "html-format"
    }

    fn apply(&self, input: String) -> Result<String, TransformError> {
        Ok(self.format(&input))
    }
}

fn is_inline(name: &str) -> bool {
    INLINE_ELEMENTS.contains(&name)
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

fn starts_block(token: &Token<'_>) -> bool {
    match token {
        Token::Open { name, .. } | Token::Close { name, .. } => !is_inline(name),
        Token::Verbatim(_) => true,
        _ => false,
    }
}

fn mark_block_child(stack: &mut [Frame]) {
    if let Some(frame) = stack.last_mut() {
        frame.has_block_child = true;
    }
}

/// Strip the common leading indentation of a code block.
fn reindent(body: &str) -> Vec<String> {
    let common = body
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    body.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.get(common..).unwrap_or(l.trim_start()).trim_end().to_string())
        .collect()
}
