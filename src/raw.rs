//! Parser output. Lives only between `parse` and `compile`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// How an attribute was written, before any semantic resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeSyntax {
    /// `name="literal"`
    Plain,
    /// `[name]="expr"`
    Bound,
    /// `*name='expr'`
    Directive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttribute {
    pub name: String,
    pub value: String,
    pub syntax: AttributeSyntax,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum TextSegment {
    Literal(String),
    /// Unparsed contents of a `{{ ... }}` placeholder.
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawElement {
    pub tag: String,
    pub attributes: Vec<RawAttribute>,
    pub children: Vec<RawNode>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RawNode {
    Element(RawElement),
    Text {
        segments: Vec<TextSegment>,
        location: SourceLocation,
    },
    /// Opaque body of a raw-text element such as `<script>`.
    RawText { value: String },
    Comment { value: String },
}

impl RawNode {
    pub fn as_element(&self) -> Option<&RawElement> {
        match self {
            RawNode::Element(el) => Some(el),
            _ => None,
        }
    }
}

impl RawElement {
    pub fn attribute(&self, name: &str) -> Option<&RawAttribute> {
        self.attributes.iter().rev().find(|a| a.name == name)
    }
}
