//! Parse Module
//!
//! Hand-written markup scanner producing a [`RawNode`] tree. Binding syntax
//! (`[attr]`, `*directive`, `{{ path }}`) is recognised here but left
//! unresolved; the compiler gives it meaning.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use tracing::debug;

use crate::error::TemplateError;
use crate::raw::{AttributeSyntax, RawAttribute, RawElement, RawNode, SourceLocation, TextSegment};

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

pub const DEFAULT_RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub const DEFAULT_MAX_DEPTH: usize = 512;

pub const DEFAULT_VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub fn is_default_void_element(tag: &str) -> bool {
    DEFAULT_VOID_ELEMENTS
        .iter()
        .any(|v| v.eq_ignore_ascii_case(tag))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseOptions {
    /// Elements whose body is copied verbatim, never scanned for markup or placeholders.
    pub raw_text_elements: Vec<String>,
    /// Elements that never have children or a closing tag.
    pub void_elements: Vec<String>,
    /// Drop whitespace-only text between elements.
    pub collapse_whitespace: bool,
    /// Deepest element nesting accepted. Compilation and evaluation recurse
    /// once per level, so this also bounds their stack use.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            raw_text_elements: DEFAULT_RAW_TEXT_ELEMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            void_elements: DEFAULT_VOID_ELEMENTS.iter().map(|s| s.to_string()).collect(),
            collapse_whitespace: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseOptions {
    fn is_void(&self, tag: &str) -> bool {
        self.void_elements.iter().any(|v| v.eq_ignore_ascii_case(tag))
    }

    fn is_raw_text(&self, tag: &str) -> bool {
        self.raw_text_elements
            .iter()
            .any(|v| v.eq_ignore_ascii_case(tag))
    }
}

lazy_static! {
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"(?s)\{\{.*?\}\}").unwrap();

    static ref ENTITY_RE: Regex =
        Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHARACTER REFERENCES
// ═══════════════════════════════════════════════════════════════════════════════

fn decode_entity(body: &str) -> Option<char> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

/// Decode the small set of character references templates use. Unknown
/// references are left as written.
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| match decode_entity(&caps[1]) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCANNER
// ═══════════════════════════════════════════════════════════════════════════════

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

fn is_attr_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':'
}

/// Last resolved position. Locations are requested in mostly increasing
/// order, so resolving from here keeps the scan linear overall.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    offset: usize,
    line: u32,
    column: u32,
}

impl Cursor {
    const START: Cursor = Cursor {
        offset: 0,
        line: 1,
        column: 1,
    };
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    cursor: Cell<Cursor>,
    options: &'a ParseOptions,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, options: &'a ParseOptions) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
            cursor: Cell::new(Cursor::START),
            options,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes().get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.src[self.pos..].starts_with(s)
    }

    fn skip_ws(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn location(&self, offset: usize) -> SourceLocation {
        let offset = offset.min(self.src.len());
        let mut cursor = self.cursor.get();
        if offset < cursor.offset {
            cursor = Cursor::START;
        }
        for &b in &self.bytes()[cursor.offset..offset] {
            if b == b'\n' {
                cursor.line += 1;
                cursor.column = 1;
            } else if b & 0xC0 != 0x80 {
                // UTF-8 continuation bytes do not start a new column.
                cursor.column += 1;
            }
        }
        cursor.offset = offset;
        self.cursor.set(cursor);
        SourceLocation {
            line: cursor.line,
            column: cursor.column,
        }
    }

    fn malformed(&self, offset: usize, message: impl Into<String>) -> TemplateError {
        let loc = self.location(offset);
        TemplateError::malformed(message, loc.line, loc.column)
    }

    /// `<` opens markup only when followed by a tag name, `/` or `!`.
    fn at_markup(&self) -> bool {
        self.peek() == Some(b'<')
            && matches!(self.peek_at(1), Some(b) if is_name_start(b) || b == b'/' || b == b'!')
    }

    fn read_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if pred(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        &self.src[start..self.pos]
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Nodes
    // ───────────────────────────────────────────────────────────────────────────

    /// Parse siblings until the closing tag of `parent`, or end of input at top level.
    fn parse_children(
        &mut self,
        parent: Option<(&str, usize)>,
    ) -> Result<Vec<RawNode>, TemplateError> {
        let mut nodes = Vec::new();
        loop {
            if self.at_end() {
                return match parent {
                    Some((tag, start)) => Err(self.malformed(start, format!("unclosed <{}>", tag))),
                    None => Ok(nodes),
                };
            }

            if self.starts_with("<!--") {
                nodes.push(self.parse_comment()?);
            } else if self.starts_with("</") {
                let start = self.pos;
                let name = self.parse_closing_tag()?;
                return match parent {
                    Some((tag, _)) if tag.eq_ignore_ascii_case(&name) => Ok(nodes),
                    Some((tag, _)) => Err(self.malformed(
                        start,
                        format!("unexpected closing tag </{}>, expected </{}>", name, tag),
                    )),
                    None => Err(self.malformed(start, format!("unexpected closing tag </{}>", name))),
                };
            } else if self.starts_with("<!") {
                return Err(self.malformed(self.pos, "markup declarations are not supported"));
            } else if self.at_markup() {
                nodes.push(self.parse_element()?);
            } else if let Some(text) = self.parse_text()? {
                nodes.push(text);
            }
        }
    }

    fn parse_comment(&mut self) -> Result<RawNode, TemplateError> {
        let start = self.pos;
        self.pos += "<!--".len();
        match self.src[self.pos..].find("-->") {
            Some(end) => {
                let value = self.src[self.pos..self.pos + end].to_string();
                self.pos += end + "-->".len();
                Ok(RawNode::Comment { value })
            }
            None => Err(self.malformed(start, "unterminated comment")),
        }
    }

    fn parse_closing_tag(&mut self) -> Result<String, TemplateError> {
        let start = self.pos;
        self.pos += 2;
        let name = self.read_while(is_name_char).to_string();
        if name.is_empty() {
            return Err(self.malformed(start, "closing tag without a name"));
        }
        self.skip_ws();
        if self.peek() != Some(b'>') {
            return Err(self.malformed(start, format!("unterminated closing tag </{}", name)));
        }
        self.pos += 1;
        Ok(name)
    }

    fn parse_element(&mut self) -> Result<RawNode, TemplateError> {
        let start = self.pos;
        let location = self.location(start);
        self.pos += 1;
        let tag = self.read_while(is_name_char).to_string();

        let mut attributes = Vec::new();
        let self_closing = loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(self.malformed(start, format!("unterminated start tag <{}", tag))),
                Some(b'>') => {
                    self.pos += 1;
                    break false;
                }
                Some(b'/') if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    break true;
                }
                Some(_) => attributes.push(self.parse_attribute()?),
            }
        };

        let children = if self_closing || self.options.is_void(&tag) {
            Vec::new()
        } else if self.options.is_raw_text(&tag) {
            let value = self.read_raw_text(&tag, start)?;
            if value.is_empty() {
                Vec::new()
            } else {
                vec![RawNode::RawText { value }]
            }
        } else {
            if self.depth >= self.options.max_depth {
                return Err(self.malformed(
                    start,
                    format!("nesting too deep, limit is {} levels", self.options.max_depth),
                ));
            }
            self.depth += 1;
            let children = self.parse_children(Some((&tag, start)))?;
            self.depth -= 1;
            children
        };

        Ok(RawNode::Element(RawElement {
            tag,
            attributes,
            children,
            location,
        }))
    }

    /// Consume everything up to the matching closing tag, verbatim.
    fn read_raw_text(&mut self, tag: &str, start: usize) -> Result<String, TemplateError> {
        let body_start = self.pos;
        let bytes = self.bytes();
        let mut search = body_start;
        while let Some(found) = self.src[search..].find("</") {
            let name_start = search + found + 2;
            let name_end = name_start + tag.len();
            let name_matches = bytes
                .get(name_start..name_end)
                .map(|n| n.eq_ignore_ascii_case(tag.as_bytes()))
                .unwrap_or(false);
            let terminated = matches!(bytes.get(name_end), Some(b) if *b == b'>' || b.is_ascii_whitespace());
            if name_matches && terminated {
                let value = self.src[body_start..search + found].to_string();
                self.pos = search + found;
                let name = self.parse_closing_tag()?;
                debug_assert!(name.eq_ignore_ascii_case(tag));
                return Ok(value);
            }
            search = name_start;
        }
        Err(self.malformed(start, format!("unterminated <{}> body", tag)))
    }

    fn parse_text(&mut self) -> Result<Option<RawNode>, TemplateError> {
        let start = self.pos;
        // A lone '<' that does not open markup is literal text.
        if self.peek() == Some(b'<') {
            self.pos += 1;
        }
        while !self.at_end() && !self.at_markup() {
            self.pos += 1;
        }
        let text = &self.src[start..self.pos];
        if self.options.collapse_whitespace && text.trim().is_empty() {
            return Ok(None);
        }
        let location = self.location(start);
        let segments = self.tokenize_text(text, start)?;
        Ok(Some(RawNode::Text { segments, location }))
    }

    fn tokenize_text(&self, text: &str, offset: usize) -> Result<Vec<TextSegment>, TemplateError> {
        let mut segments = Vec::new();
        let mut last_end = 0;

        for m in PLACEHOLDER_RE.find_iter(text) {
            if m.start() > last_end {
                segments.push(TextSegment::Literal(decode_entities(&text[last_end..m.start()])));
            }
            let inner = &text[m.start() + 2..m.end() - 2];
            segments.push(TextSegment::Placeholder(inner.trim().to_string()));
            last_end = m.end();
        }

        let rest = &text[last_end..];
        if let Some(open) = rest.find("{{") {
            return Err(self.malformed(offset + last_end + open, "unterminated interpolation '{{'"));
        }
        if !rest.is_empty() {
            segments.push(TextSegment::Literal(decode_entities(rest)));
        }
        Ok(segments)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Attributes
    // ───────────────────────────────────────────────────────────────────────────

    fn parse_attribute(&mut self) -> Result<RawAttribute, TemplateError> {
        let start = self.pos;
        let location = self.location(start);
        let syntax = match self.peek() {
            Some(b'[') => {
                self.pos += 1;
                AttributeSyntax::Bound
            }
            Some(b'*') => {
                self.pos += 1;
                AttributeSyntax::Directive
            }
            Some(b) if is_attr_name_start(b) => AttributeSyntax::Plain,
            _ => {
                let found = self.src[self.pos..].chars().next().unwrap_or(' ');
                return Err(self.malformed(start, format!("invalid attribute syntax near '{}'", found)));
            }
        };

        let name = self.read_while(is_name_char).to_string();
        if name.is_empty() {
            return Err(self.malformed(start, "missing attribute name"));
        }
        if syntax == AttributeSyntax::Bound {
            if self.peek() != Some(b']') {
                return Err(self.malformed(start, format!("unclosed binding '[{}'", name)));
            }
            self.pos += 1;
        }

        self.skip_ws();
        let value = if self.peek() == Some(b'=') {
            self.pos += 1;
            self.skip_ws();
            Some(self.read_attribute_value(&name)?)
        } else {
            None
        };

        let value = match (syntax, value) {
            (AttributeSyntax::Plain, None) => String::new(),
            (AttributeSyntax::Plain, Some(v)) => decode_entities(&v),
            (_, Some(v)) => v,
            (_, None) => {
                return Err(self.malformed(start, format!("attribute '{}' requires a value", name)))
            }
        };

        Ok(RawAttribute {
            name,
            value,
            syntax,
            location,
        })
    }

    fn read_attribute_value(&mut self, name: &str) -> Result<String, TemplateError> {
        let start = self.pos;
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let body_start = self.pos;
                match self.bytes()[body_start..].iter().position(|b| *b == quote) {
                    Some(len) => {
                        self.pos = body_start + len + 1;
                        Ok(self.src[body_start..body_start + len].to_string())
                    }
                    None => Err(self.malformed(
                        start,
                        format!("unterminated value for attribute '{}'", name),
                    )),
                }
            }
            _ => {
                while let Some(b) = self.peek() {
                    let self_closing = b == b'/' && self.peek_at(1) == Some(b'>');
                    if b.is_ascii_whitespace() || b == b'>' || self_closing {
                        break;
                    }
                    self.pos += 1;
                }
                let value = &self.src[start..self.pos];
                if value.is_empty() {
                    return Err(self.malformed(start, format!("missing value for attribute '{}'", name)));
                }
                Ok(value.to_string())
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN PARSING FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn is_blank_text(segments: &[TextSegment]) -> bool {
    segments.iter().all(|s| match s {
        TextSegment::Literal(text) => text.trim().is_empty(),
        TextSegment::Placeholder(_) => false,
    })
}

/// Parse a template with [`ParseOptions::default`].
pub fn parse(source: &str) -> Result<RawNode, TemplateError> {
    parse_with_options(source, &ParseOptions::default())
}

/// Parse a template into a single-root raw tree.
///
/// Top-level comments and whitespace are dropped. What remains must be
/// exactly one element.
pub fn parse_with_options(source: &str, options: &ParseOptions) -> Result<RawNode, TemplateError> {
    if source.trim().is_empty() {
        return Err(TemplateError::Empty);
    }

    let mut parser = Parser::new(source, options);
    let nodes = parser.parse_children(None)?;

    let mut roots: Vec<RawNode> = nodes
        .into_iter()
        .filter(|node| match node {
            RawNode::Comment { .. } => false,
            RawNode::Text { segments, .. } => !is_blank_text(segments),
            _ => true,
        })
        .collect();

    match roots.len() {
        0 => Err(TemplateError::CommentOnly),
        1 => match roots.pop() {
            Some(RawNode::Text { location, .. }) => Err(TemplateError::malformed(
                "template root must be an element",
                location.line,
                location.column,
            )),
            Some(root) => {
                if let RawNode::Element(el) = &root {
                    debug!(tag = %el.tag, children = el.children.len(), "parsed template root");
                }
                Ok(root)
            }
            None => Err(TemplateError::CommentOnly),
        },
        count => Err(TemplateError::MultipleRoots { count }),
    }
}
