//! Render pipeline: source text + state in, element tree out.

#[cfg(feature = "napi")]
use napi_derive::napi;
use rayon::prelude::*;
use tracing::debug;

use crate::compile::compile_str;
use crate::element::Element;
use crate::error::TemplateError;
use crate::evaluate::evaluate;
use crate::state::StateNode;
use crate::template::Template;

/// Parse, compile and evaluate in one step. Prefer compiling once and
/// calling [`evaluate`] when the same template renders repeatedly.
pub fn render(source: &str, state: &StateNode) -> Result<Element, TemplateError> {
    let template = compile_str(source)?;
    Ok(evaluate(&template, state))
}

/// Evaluate one shared template against many states in parallel.
/// Output order matches `states`.
pub fn render_all(template: &Template, states: &[StateNode]) -> Vec<Element> {
    debug!(count = states.len(), root = ?template.tag(), "rendering batch");
    states
        .par_iter()
        .map(|state| evaluate(template, state))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
fn template_error_to_napi(error: TemplateError) -> napi::Error {
    let diagnostic = crate::error::Diagnostic::from(&error);
    let reason = serde_json::to_string(&diagnostic).unwrap_or_else(|_| error.to_string());
    napi::Error::from_reason(reason)
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_template_native(source: String) -> napi::Result<serde_json::Value> {
    let template = compile_str(&source).map_err(template_error_to_napi)?;
    serde_json::to_value(template).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(feature = "napi")]
#[napi]
pub fn render_template_native(source: String, state: serde_json::Value) -> napi::Result<String> {
    let state = StateNode::from_json(&state).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let element = render(&source, &state).map_err(template_error_to_napi)?;
    Ok(element.outer_html())
}
