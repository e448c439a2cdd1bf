//! # Template Binding Engine
//!
//! Compiles a markup template into an immutable [`Template`] and evaluates it
//! against a [`StateNode`] to produce a concrete [`Element`] tree.
//!
//! ```text
//! source ──parse──▶ RawNode ──compile──▶ Template ──evaluate(StateNode)──▶ Element
//! ```
//!
//! ## Binding syntax
//!
//! - `[name]="path"` binds an attribute to a dotted path.
//! - `{{ path }}` interpolates into text.
//! - `*ng-for='#item of path'` repeats an element once per list item.
//! - `<script>` and `<style>` bodies are raw text and never interpolated.
//!
//! ## Invariants
//!
//! 1. **Single root**: a template has exactly one element root. Comments
//!    around it are dropped.
//! 2. **Errors are structural**: every failure is reported by `parse` or
//!    `compile`. `evaluate` is total; missing data omits an attribute or
//!    renders as empty text.
//! 3. **Scope chain**: a path's head resolves innermost loop frame first,
//!    then outward to the root state. First match wins.
//! 4. **Determinism**: equal templates and equal state produce equal trees.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod cache;
mod compile;
mod element;
mod error;
mod evaluate;
mod parse;
mod raw;
mod render;
mod state;
mod template;
mod visitor;

#[cfg(test)]
mod evaluate_tests;
#[cfg(test)]
mod test_support;

pub use cache::{CacheEntry, TemplateCache};
pub use compile::{compile, compile_str, compile_str_with_options, LOOP_DIRECTIVES};
pub use element::{Element, FRAGMENT_TAG, TEXT_TAG};
pub use error::{Diagnostic, StateError, TemplateError};
pub use evaluate::{evaluate, Resolved, Scope};
pub use parse::{parse, parse_with_options, ParseOptions};
pub use raw::{AttributeSyntax, RawAttribute, RawElement, RawNode, SourceLocation, TextSegment};
pub use render::{render, render_all};
pub use state::{StateNode, Value};
pub use template::{
    AttributeTemplate, ElementTemplate, InvalidPath, LoopTemplate, Path, Template, TextPart,
};
pub use visitor::{walk_element, walk_loop, walk_node, TemplateVisitor};

#[cfg(feature = "napi")]
pub use render::{compile_template_native, render_template_native};

#[cfg(feature = "napi")]
#[napi]
pub fn engine_bridge() -> String {
    "Binding Engine Native Bridge Connected".to_string()
}
