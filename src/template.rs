//! Compiled template tree.
//!
//! A [`Template`] is immutable once compiled and owns all of its data, so a
//! single instance can be shared (`Arc`) and evaluated from many threads.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref PATH_RE: Regex =
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$-]*(?:\.[A-Za-z_$][A-Za-z0-9_$-]*)*$").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATH
// ═══════════════════════════════════════════════════════════════════════════════

/// Dotted lookup such as `todo.title`. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    segments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPath(pub String);

impl fmt::Display for InvalidPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a dotted path", self.0)
    }
}

impl Path {
    /// The identifier resolved through the scope chain.
    pub fn head(&self) -> &str {
        &self.segments[0]
    }

    /// Field lookups applied to whatever `head` resolved to.
    pub fn tail(&self) -> &[String] {
        &self.segments[1..]
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl FromStr for Path {
    type Err = InvalidPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if !PATH_RE.is_match(trimmed) {
            return Err(InvalidPath(trimmed.to_string()));
        }
        Ok(Path {
            segments: trimmed.split('.').map(str::to_string).collect(),
        })
    }
}

impl TryFrom<String> for Path {
    type Error = InvalidPath;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AttributeTemplate {
    Static { name: String, value: String },
    Bound { name: String, path: Path },
}

impl AttributeTemplate {
    pub fn name(&self) -> &str {
        match self {
            AttributeTemplate::Static { name, .. } | AttributeTemplate::Bound { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum TextPart {
    Literal(String),
    Binding(Path),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementTemplate {
    pub tag: String,
    /// Static and bound attributes in source order.
    pub attributes: Vec<AttributeTemplate>,
    pub children: Vec<Template>,
}

impl ElementTemplate {
    pub fn static_attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().filter_map(|attr| match attr {
            AttributeTemplate::Static { name, value } => Some((name.as_str(), value.as_str())),
            AttributeTemplate::Bound { .. } => None,
        })
    }

    pub fn bound_attributes(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.attributes.iter().filter_map(|attr| match attr {
            AttributeTemplate::Bound { name, path } => Some((name.as_str(), path)),
            AttributeTemplate::Static { .. } => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopTemplate {
    pub item_alias: String,
    pub source_path: Path,
    pub body: Box<Template>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Template {
    Element(ElementTemplate),
    Loop(LoopTemplate),
    StaticText { value: String },
    InterpolatedText { parts: Vec<TextPart> },
    /// Body of a raw-text element, never interpolated.
    RawText { value: String },
}

impl Template {
    pub fn as_element(&self) -> Option<&ElementTemplate> {
        match self {
            Template::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.as_element().map(|el| el.tag.as_str())
    }
}
