#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_EMPTY: &str = "TPL-ERR-EMPTY";
pub const ERR_COMMENT_ONLY: &str = "TPL-ERR-COMMENT-ONLY";
pub const ERR_MULTIPLE_ROOTS: &str = "TPL-ERR-MULTIPLE-ROOTS";
pub const ERR_MALFORMED: &str = "TPL-ERR-MALFORMED";

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_EMPTY => "A template always contains markup.",
        ERR_COMMENT_ONLY => "A template always has an element root besides its comments.",
        ERR_MULTIPLE_ROOTS => "A template evaluates to exactly one root element.",
        ERR_MALFORMED => {
            "Tags are balanced, attributes are well-formed and bindings are dotted paths."
        }
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Structural problems found while parsing or compiling a template.
///
/// Evaluation never fails, so this is the only error a caller of the
/// parse → compile → evaluate pipeline has to handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template is empty")]
    Empty,

    /// Subtype of [`TemplateError::Empty`]: only comments and whitespace.
    #[error("template contains only comments")]
    CommentOnly,

    #[error("template has {count} root nodes, expected exactly one")]
    MultipleRoots { count: usize },

    #[error("malformed markup at {line}:{column}: {message}")]
    MalformedMarkup {
        message: String,
        line: u32,
        column: u32,
    },
}

impl TemplateError {
    pub fn malformed(message: impl Into<String>, line: u32, column: u32) -> Self {
        TemplateError::MalformedMarkup {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TemplateError::Empty => ERR_EMPTY,
            TemplateError::CommentOnly => ERR_COMMENT_ONLY,
            TemplateError::MultipleRoots { .. } => ERR_MULTIPLE_ROOTS,
            TemplateError::MalformedMarkup { .. } => ERR_MALFORMED,
        }
    }

    /// True for both the plain empty case and the comment-only case.
    pub fn is_empty_template(&self) -> bool {
        matches!(self, TemplateError::Empty | TemplateError::CommentOnly)
    }

    fn position(&self) -> (u32, u32) {
        match self {
            TemplateError::MalformedMarkup { line, column, .. } => (*line, *column),
            _ => (0, 0),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("state root must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("list '{key}' may only contain objects, found {found} at index {index}")]
    UnsupportedListItem {
        key: String,
        index: usize,
        found: &'static str,
    },

    #[error("number for '{key}' is not representable")]
    UnsupportedNumber { key: String },
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC
// ═══════════════════════════════════════════════════════════════════════════════

/// Serializable form of a [`TemplateError`], the shape handed to JS callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub guarantee: String,
    pub line: u32,
    pub column: u32,
    pub hints: Vec<String>,
}

impl From<&TemplateError> for Diagnostic {
    fn from(error: &TemplateError) -> Self {
        let code = error.code();
        let (line, column) = error.position();
        let hints = match error {
            TemplateError::Empty | TemplateError::CommentOnly => {
                vec!["Wrap the template content in a single root element.".to_string()]
            }
            TemplateError::MultipleRoots { .. } => vec![
                "Wrap sibling elements in a common parent such as <div>.".to_string(),
                "Comments before and after the root are allowed.".to_string(),
            ],
            TemplateError::MalformedMarkup { .. } => vec![],
        };
        Diagnostic {
            code: code.to_string(),
            message: error.to_string(),
            guarantee: get_guarantee(code).to_string(),
            line,
            column,
            hints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_only_is_empty_class() {
        assert!(TemplateError::Empty.is_empty_template());
        assert!(TemplateError::CommentOnly.is_empty_template());
        assert!(!TemplateError::MultipleRoots { count: 2 }.is_empty_template());
    }

    #[test]
    fn test_diagnostic_carries_position() {
        let err = TemplateError::malformed("unexpected closing tag </span>", 3, 14);
        let diag = Diagnostic::from(&err);
        assert_eq!(diag.code, ERR_MALFORMED);
        assert_eq!((diag.line, diag.column), (3, 14));
        assert!(diag.message.contains("</span>"));
        assert!(!diag.guarantee.is_empty());
    }

    #[test]
    fn test_multiple_roots_message() {
        let err = TemplateError::MultipleRoots { count: 2 };
        assert_eq!(
            err.to_string(),
            "template has 2 root nodes, expected exactly one"
        );
        assert_eq!(Diagnostic::from(&err).hints.len(), 2);
    }
}
