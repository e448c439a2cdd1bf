use crate::template::{AttributeTemplate, ElementTemplate, LoopTemplate, Path, Template, TextPart};

/// Read-only traversal over a compiled [`Template`].
///
/// Rules:
/// 1. Traversal order is document order and fixed.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers call the matching `walk_*` function to continue into
///    children unless pruning is intended.
pub trait TemplateVisitor {
    fn visit_node(&mut self, node: &Template) {
        walk_node(self, node);
    }

    fn visit_element(&mut self, element: &ElementTemplate) {
        walk_element(self, element);
    }

    fn visit_loop(&mut self, fragment: &LoopTemplate) {
        walk_loop(self, fragment);
    }

    fn visit_attribute(&mut self, _attribute: &AttributeTemplate) {}

    fn visit_text(&mut self, _parts: &[TextPart]) {}

    fn visit_static_text(&mut self, _value: &str) {}

    fn visit_raw_text(&mut self, _value: &str) {}
}

pub fn walk_node<V: TemplateVisitor + ?Sized>(visitor: &mut V, node: &Template) {
    match node {
        Template::Element(el) => visitor.visit_element(el),
        Template::Loop(lp) => visitor.visit_loop(lp),
        Template::StaticText { value } => visitor.visit_static_text(value),
        Template::InterpolatedText { parts } => visitor.visit_text(parts),
        Template::RawText { value } => visitor.visit_raw_text(value),
    }
}

pub fn walk_element<V: TemplateVisitor + ?Sized>(visitor: &mut V, element: &ElementTemplate) {
    for attr in &element.attributes {
        visitor.visit_attribute(attr);
    }
    for child in &element.children {
        visitor.visit_node(child);
    }
}

pub fn walk_loop<V: TemplateVisitor + ?Sized>(visitor: &mut V, fragment: &LoopTemplate) {
    visitor.visit_node(&fragment.body);
}

// ═══════════════════════════════════════════════════════════════════════════════
// REFERENCED PATHS
// ═══════════════════════════════════════════════════════════════════════════════

/// Collects paths read from the caller's root scope, skipping those whose
/// head is an enclosing loop alias.
#[derive(Default)]
struct RootPathCollector {
    aliases: Vec<String>,
    paths: Vec<Path>,
}

impl RootPathCollector {
    fn record(&mut self, path: &Path) {
        if self.aliases.iter().any(|alias| alias == path.head()) {
            return;
        }
        if !self.paths.contains(path) {
            self.paths.push(path.clone());
        }
    }
}

impl TemplateVisitor for RootPathCollector {
    fn visit_loop(&mut self, fragment: &LoopTemplate) {
        // The source is read in the enclosing scope, before the alias exists.
        self.record(&fragment.source_path);
        self.aliases.push(fragment.item_alias.clone());
        walk_loop(self, fragment);
        self.aliases.pop();
    }

    fn visit_attribute(&mut self, attribute: &AttributeTemplate) {
        if let AttributeTemplate::Bound { path, .. } = attribute {
            self.record(path);
        }
    }

    fn visit_text(&mut self, parts: &[TextPart]) {
        for part in parts {
            if let TextPart::Binding(path) = part {
                self.record(path);
            }
        }
    }
}

impl Template {
    /// Paths this template reads from the root state, deduplicated, in document order.
    pub fn referenced_paths(&self) -> Vec<Path> {
        let mut collector = RootPathCollector::default();
        collector.visit_node(self);
        collector.paths
    }
}
