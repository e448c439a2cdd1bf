//! Template evaluator.
//!
//! Walks a compiled [`Template`] against a [`StateNode`] and materializes a
//! fresh [`Element`] tree. Evaluation is total: a path that resolves to
//! nothing omits the attribute or renders as empty text.
//!
//! ## Scope chain
//!
//! Each `Loop` pushes one frame per item binding the loop alias to that item.
//! A path's first identifier is looked up innermost frame first; the first
//! frame that defines it wins. Remaining identifiers are field lookups on the
//! resolved node.

use tracing::trace;

use crate::element::{Element, FRAGMENT_TAG};
use crate::state::{StateNode, Value};
use crate::template::{AttributeTemplate, ElementTemplate, Path, Template, TextPart};

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPE CHAIN
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
enum Frame<'a> {
    Root(&'a StateNode),
    Alias { name: &'a str, item: &'a StateNode },
}

/// Immutable scope frame linked to its enclosing frame. Frames live on the
/// evaluator's call stack; pushing never mutates an existing frame.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    frame: Frame<'a>,
    parent: Option<&'a Scope<'a>>,
}

/// What a path resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    /// A loop alias bound to an item.
    Node(&'a StateNode),
    Value(&'a Value),
}

impl<'a> Resolved<'a> {
    fn as_node(self) -> Option<&'a StateNode> {
        match self {
            Resolved::Node(node) => Some(node),
            Resolved::Value(value) => value.as_node(),
        }
    }
}

impl<'a> Scope<'a> {
    pub fn root(state: &'a StateNode) -> Self {
        Scope {
            frame: Frame::Root(state),
            parent: None,
        }
    }

    /// New innermost frame binding `name` to `item`.
    pub fn push(&'a self, name: &'a str, item: &'a StateNode) -> Scope<'a> {
        Scope {
            frame: Frame::Alias { name, item },
            parent: Some(self),
        }
    }

    /// Number of frames, root included.
    pub fn depth(&self) -> usize {
        1 + self.parent.map_or(0, |parent| parent.depth())
    }

    fn lookup(&self, name: &str) -> Option<Resolved<'a>> {
        let mut current: Option<&Scope<'a>> = Some(self);
        while let Some(scope) = current {
            match scope.frame {
                Frame::Alias { name: alias, item } if alias == name => {
                    return Some(Resolved::Node(item));
                }
                Frame::Alias { .. } => {}
                Frame::Root(node) => {
                    if let Some(value) = node.get(name) {
                        return Some(Resolved::Value(value));
                    }
                }
            }
            current = scope.parent;
        }
        None
    }

    pub fn resolve(&self, path: &Path) -> Option<Resolved<'a>> {
        let mut current = self.lookup(path.head())?;
        for field in path.tail() {
            current = Resolved::Value(current.as_node()?.get(field)?);
        }
        Some(current)
    }

    /// Scalar leaves only; nodes and lists have no text form.
    pub fn resolve_text(&self, path: &Path) -> Option<String> {
        match self.resolve(path)? {
            Resolved::Value(value) => value.as_text(),
            Resolved::Node(_) => None,
        }
    }

    /// Items of a multi-valued entry; anything else is an empty list.
    pub fn resolve_list(&self, path: &Path) -> &'a [StateNode] {
        match self.resolve(path) {
            Some(Resolved::Value(value)) => value.as_list().unwrap_or(&[]),
            _ => &[],
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATION
// ═══════════════════════════════════════════════════════════════════════════════

fn interpolate(parts: &[TextPart], scope: &Scope<'_>) -> String {
    let mut text = String::new();
    for part in parts {
        match part {
            TextPart::Literal(literal) => text.push_str(literal),
            TextPart::Binding(path) => {
                if let Some(value) = scope.resolve_text(path) {
                    text.push_str(&value);
                }
            }
        }
    }
    text
}

fn evaluate_element(template: &ElementTemplate, scope: &Scope<'_>) -> Element {
    let mut element = Element::new(template.tag.clone());
    for attr in &template.attributes {
        match attr {
            AttributeTemplate::Static { name, value } => {
                element.set_attribute(name.clone(), value.clone())
            }
            AttributeTemplate::Bound { name, path } => {
                if let Some(value) = scope.resolve_text(path) {
                    element.set_attribute(name.clone(), value);
                }
            }
        }
    }
    for child in &template.children {
        evaluate_into(child, scope, &mut element);
    }
    element
}

/// Append whatever `template` produces to `parent`.
fn evaluate_into(template: &Template, scope: &Scope<'_>, parent: &mut Element) {
    match template {
        Template::Element(el) => parent.append_child(evaluate_element(el, scope)),
        Template::Loop(lp) => {
            let items = scope.resolve_list(&lp.source_path);
            trace!(
                alias = %lp.item_alias,
                source = %lp.source_path,
                items = items.len(),
                depth = scope.depth(),
                "expanding loop"
            );
            for item in items {
                let frame = scope.push(&lp.item_alias, item);
                evaluate_into(&lp.body, &frame, parent);
            }
        }
        Template::StaticText { value } => parent.append_child(Element::text(value.clone())),
        Template::InterpolatedText { parts } => {
            parent.append_child(Element::text(interpolate(parts, scope)))
        }
        Template::RawText { value } => parent.set_raw_text(value.clone()),
    }
}

/// Materialize `template` against `state`.
///
/// Element templates yield that element. A bare loop yields a
/// `#document-fragment` holding one element per item, and text templates
/// yield a `#text` element.
pub fn evaluate(template: &Template, state: &StateNode) -> Element {
    let scope = Scope::root(state);
    match template {
        Template::Element(el) => evaluate_element(el, &scope),
        Template::Loop(_) => {
            let mut fragment = Element::new(FRAGMENT_TAG);
            evaluate_into(template, &scope, &mut fragment);
            fragment
        }
        Template::StaticText { value } | Template::RawText { value } => Element::text(value.clone()),
        Template::InterpolatedText { parts } => Element::text(interpolate(parts, &scope)),
    }
}
