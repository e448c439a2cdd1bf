//! Materialized output of one evaluation.

use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

use crate::parse::is_default_void_element;

pub const TEXT_TAG: &str = "#text";
pub const FRAGMENT_TAG: &str = "#document-fragment";

/// A concrete element. Text runs are children with the [`TEXT_TAG`] tag and
/// their string in `text_content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_content: Option<String>,
    /// Text content is emitted without escaping (raw-text element body).
    #[serde(skip)]
    raw_text: bool,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text_content: None,
            raw_text: false,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        let mut el = Element::new(TEXT_TAG);
        el.text_content = Some(value.into());
        el
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_text(&self) -> bool {
        self.tag == TEXT_TAG
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(n, _)| n.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Replaces an existing attribute in place, otherwise appends.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&Element> {
        self.children.get(index)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn append_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Own text for `#text` nodes and raw-text bodies. Other elements yield
    /// the concatenated text of their descendants, or `None` when no
    /// descendant carries text.
    pub fn text_content(&self) -> Option<Cow<'_, str>> {
        if let Some(text) = &self.text_content {
            return Some(Cow::Borrowed(text));
        }
        if let [only] = self.children.as_slice() {
            if only.children.is_empty() {
                if let Some(text) = &only.text_content {
                    return Some(Cow::Borrowed(text));
                }
            }
        }
        let mut out = String::new();
        self.collect_text(&mut out).then_some(Cow::Owned(out))
    }

    fn collect_text(&self, out: &mut String) -> bool {
        let mut found = false;
        for child in &self.children {
            if let Some(text) = &child.text_content {
                out.push_str(text);
                found = true;
            }
            found |= child.collect_text(out);
        }
        found
    }

    /// Verbatim body, as produced for `<script>`-like elements.
    pub fn set_raw_text(&mut self, value: impl Into<String>) {
        self.text_content = Some(value.into());
        self.raw_text = true;
    }

    /// Canonical markup of this element and its subtree.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        if self.is_text() {
            if let Some(text) = &self.text_content {
                escape_text(text, out);
            }
            return;
        }
        if self.tag == FRAGMENT_TAG {
            for child in &self.children {
                child.write_html(out);
            }
            return;
        }

        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            if !value.is_empty() {
                out.push_str("=\"");
                escape_attribute(value, out);
                out.push('"');
            }
        }
        out.push('>');

        if is_default_void_element(&self.tag) && self.children.is_empty() && self.text_content.is_none() {
            return;
        }

        if let Some(text) = &self.text_content {
            if self.raw_text {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.outer_html())
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
