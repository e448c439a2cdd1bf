//! Binding compiler: classifies every attribute, text run and child of a raw
//! tree and produces the immutable [`Template`].

use lazy_static::lazy_static;
use regex::Regex;
use std::str::FromStr;
use tracing::debug;

use crate::error::TemplateError;
use crate::parse::{parse_with_options, ParseOptions};
use crate::raw::{AttributeSyntax, RawAttribute, RawElement, RawNode, SourceLocation, TextSegment};
use crate::template::{AttributeTemplate, ElementTemplate, LoopTemplate, Path, Template, TextPart};

/// Directive names that repeat their element once per list item.
pub const LOOP_DIRECTIVES: &[&str] = &["ng-for", "ngFor"];

lazy_static! {
    /// `#todo of todos` or `let todo of todos`
    static ref LOOP_EXPR_RE: Regex =
        Regex::new(r"^\s*(?:#|let\s+)([A-Za-z_$][A-Za-z0-9_$-]*)\s+of\s+(\S.*?)\s*$").unwrap();
}

fn malformed_at(location: &SourceLocation, message: String) -> TemplateError {
    TemplateError::malformed(message, location.line, location.column)
}

fn parse_path(expr: &str, location: &SourceLocation, context: &str) -> Result<Path, TemplateError> {
    expr.parse::<Path>()
        .map_err(|e| malformed_at(location, format!("invalid binding in {}: {}", context, e)))
}

fn parse_loop_expression(attr: &RawAttribute) -> Result<(String, Path), TemplateError> {
    let caps = LOOP_EXPR_RE.captures(&attr.value).ok_or_else(|| {
        malformed_at(
            &attr.location,
            format!(
                "invalid *{} expression '{}', expected '#item of source'",
                attr.name, attr.value
            ),
        )
    })?;
    let alias = caps[1].to_string();
    let source = parse_path(&caps[2], &attr.location, &format!("*{}", attr.name))?;
    Ok((alias, source))
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODE COMPILATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Later occurrences of a name replace earlier ones.
fn push_attribute(attributes: &mut Vec<AttributeTemplate>, attribute: AttributeTemplate) {
    attributes.retain(|existing| existing.name() != attribute.name());
    attributes.push(attribute);
}

fn compile_text(segments: &[TextSegment], location: &SourceLocation) -> Result<Template, TemplateError> {
    let has_placeholder = segments
        .iter()
        .any(|s| matches!(s, TextSegment::Placeholder(_)));

    if !has_placeholder {
        let value: String = segments
            .iter()
            .filter_map(|s| match s {
                TextSegment::Literal(text) => Some(text.as_str()),
                TextSegment::Placeholder(_) => None,
            })
            .collect();
        return Ok(Template::StaticText { value });
    }

    let mut parts = Vec::with_capacity(segments.len());
    for segment in segments {
        match segment {
            TextSegment::Literal(text) if text.is_empty() => {}
            TextSegment::Literal(text) => parts.push(TextPart::Literal(text.clone())),
            TextSegment::Placeholder(expr) => {
                let context = format!("{{{{ {} }}}}", expr);
                parts.push(TextPart::Binding(parse_path(expr, location, &context)?));
            }
        }
    }
    Ok(Template::InterpolatedText { parts })
}

fn compile_element(el: &RawElement) -> Result<Template, TemplateError> {
    let mut attributes = Vec::with_capacity(el.attributes.len());
    let mut loop_directive: Option<&RawAttribute> = None;

    for attr in &el.attributes {
        match attr.syntax {
            AttributeSyntax::Plain => push_attribute(
                &mut attributes,
                AttributeTemplate::Static {
                    name: attr.name.clone(),
                    value: attr.value.clone(),
                },
            ),
            AttributeSyntax::Bound => {
                let context = format!("[{}]", attr.name);
                let path = parse_path(&attr.value, &attr.location, &context)?;
                push_attribute(
                    &mut attributes,
                    AttributeTemplate::Bound {
                        name: attr.name.clone(),
                        path,
                    },
                );
            }
            AttributeSyntax::Directive => {
                if !LOOP_DIRECTIVES.contains(&attr.name.as_str()) {
                    return Err(malformed_at(
                        &attr.location,
                        format!("unsupported directive '*{}'", attr.name),
                    ));
                }
                if loop_directive.is_some() {
                    return Err(malformed_at(
                        &attr.location,
                        format!("<{}> carries more than one loop directive", el.tag),
                    ));
                }
                loop_directive = Some(attr);
            }
        }
    }

    let mut children = Vec::with_capacity(el.children.len());
    for child in &el.children {
        if let Some(compiled) = compile_node(child)? {
            children.push(compiled);
        }
    }

    let element = Template::Element(ElementTemplate {
        tag: el.tag.clone(),
        attributes,
        children,
    });

    match loop_directive {
        Some(attr) => {
            let (item_alias, source_path) = parse_loop_expression(attr)?;
            Ok(Template::Loop(LoopTemplate {
                item_alias,
                source_path,
                body: Box::new(element),
            }))
        }
        None => Ok(element),
    }
}

/// Comments compile to nothing.
fn compile_node(node: &RawNode) -> Result<Option<Template>, TemplateError> {
    match node {
        RawNode::Element(el) => compile_element(el).map(Some),
        RawNode::Text { segments, location } => compile_text(segments, location).map(Some),
        RawNode::RawText { value } => Ok(Some(Template::RawText {
            value: value.clone(),
        })),
        RawNode::Comment { .. } => Ok(None),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Compile a parsed tree. Pure: the same raw tree always yields the same template.
pub fn compile(root: &RawNode) -> Result<Template, TemplateError> {
    if let RawNode::Element(el) = root {
        if let Some(directive) = el
            .attributes
            .iter()
            .find(|a| a.syntax == AttributeSyntax::Directive)
        {
            return Err(malformed_at(
                &directive.location,
                format!("*{} is not allowed on the root element", directive.name),
            ));
        }
    }

    let template = compile_node(root)?.ok_or(TemplateError::CommentOnly)?;
    debug!(root = ?template.tag(), "compiled template");
    Ok(template)
}

pub fn compile_str(source: &str) -> Result<Template, TemplateError> {
    compile_str_with_options(source, &ParseOptions::default())
}

pub fn compile_str_with_options(
    source: &str,
    options: &ParseOptions,
) -> Result<Template, TemplateError> {
    compile(&parse_with_options(source, options)?)
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        compile_str(s)
    }
}
