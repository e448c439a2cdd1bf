//! Hierarchical data container a template is evaluated against.
//!
//! The caller owns and mutates [`StateNode`]s between renders; the evaluator
//! only ever borrows them immutably for the duration of one call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::StateError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<StateNode>),
    Node(StateNode),
}

impl Value {
    /// Text form of a scalar leaf. Nested nodes and lists have none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(float_text(*f)),
            Value::Bool(b) => Some(b.to_string()),
            Value::Node(_) | Value::List(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&StateNode> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[StateNode]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Shortest round-trip decimal. Non-finite values use the spellings a JS
/// host produces, since `Display` would print `inf` and `NaN`.
fn float_text(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f == f64::INFINITY {
        "Infinity".to_string()
    } else if f == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        f.to_string()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<StateNode> for Value {
    fn from(node: StateNode) -> Self {
        Value::Node(node)
    }
}

impl From<Vec<StateNode>> for Value {
    fn from(items: Vec<StateNode>) -> Self {
        Value::List(items)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateNode {
    entries: HashMap<String, Value>,
}

impl StateNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, returning the value it replaced.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder form of [`StateNode::put`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Items of the list stored at `key`; empty when absent or not a list.
    pub fn get_multi_valued(&self, key: &str) -> &[StateNode] {
        self.entries
            .get(key)
            .and_then(Value::as_list)
            .unwrap_or(&[])
    }

    /// Mutable list at `key`, created empty on first access. A non-list
    /// value already stored there is replaced.
    pub fn multi_valued_mut(&mut self, key: &str) -> &mut Vec<StateNode> {
        let slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::List(Vec::new()));
        if !matches!(slot, Value::List(_)) {
            *slot = Value::List(Vec::new());
        }
        match slot {
            Value::List(items) => items,
            _ => unreachable!("slot was just set to a list"),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ───────────────────────────────────────────────────────────────────────────
    // JSON import
    // ───────────────────────────────────────────────────────────────────────────

    /// Build a node from a JSON object. Nested objects become child nodes,
    /// arrays of objects become multi-valued lists and `null` keys are skipped.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, StateError> {
        match json {
            serde_json::Value::Object(map) => {
                let mut node = StateNode::new();
                for (key, value) in map {
                    if let Some(converted) = json_to_value(key, value)? {
                        node.put(key.clone(), converted);
                    }
                }
                Ok(node)
            }
            other => Err(StateError::NotAnObject {
                found: json_kind(other),
            }),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn json_to_value(key: &str, value: &serde_json::Value) -> Result<Option<Value>, StateError> {
    let converted = match value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::Integer(i),
            (None, Some(f)) => Value::Float(f),
            (None, None) => {
                return Err(StateError::UnsupportedNumber {
                    key: key.to_string(),
                })
            }
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Object(_) => Value::Node(StateNode::from_json(value)?),
        serde_json::Value::Array(items) => {
            let mut nodes = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                if !item.is_object() {
                    return Err(StateError::UnsupportedListItem {
                        key: key.to_string(),
                        index,
                        found: json_kind(item),
                    });
                }
                nodes.push(StateNode::from_json(item)?);
            }
            Value::List(nodes)
        }
    };
    Ok(Some(converted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_put_last_write_wins() {
        let mut node = StateNode::new();
        assert_eq!(node.put("key", "a"), None);
        assert_eq!(node.put("key", "b"), Some(Value::from("a")));
        assert_eq!(node.get("key"), Some(&Value::from("b")));
        assert_eq!(node.len(), 1);
    }

    #[test]
    fn test_multi_valued_created_on_first_access() {
        let mut node = StateNode::new();
        assert!(node.get_multi_valued("todos").is_empty());
        assert!(!node.contains_key("todos"));

        node.multi_valued_mut("todos")
            .push(StateNode::new().with("title", "first"));
        node.multi_valued_mut("todos")
            .push(StateNode::new().with("title", "second"));

        let todos = node.get_multi_valued("todos");
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[1].get("title"), Some(&Value::from("second")));
    }

    #[test]
    fn test_multi_valued_replaces_scalar() {
        let mut node = StateNode::new().with("items", "oops");
        assert!(node.get_multi_valued("items").is_empty());
        node.multi_valued_mut("items").push(StateNode::new());
        assert_eq!(node.get_multi_valued("items").len(), 1);
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(Value::from(42).as_text().as_deref(), Some("42"));
        assert_eq!(Value::from(2.5).as_text().as_deref(), Some("2.5"));
        assert_eq!(Value::from(3.0).as_text().as_deref(), Some("3"));
        assert_eq!(Value::from(true).as_text().as_deref(), Some("true"));
        assert_eq!(Value::from(StateNode::new()).as_text(), None);
        assert_eq!(Value::from(Vec::<StateNode>::new()).as_text(), None);
    }

    #[test]
    fn test_non_finite_floats_have_fixed_text() {
        assert_eq!(Value::from(f64::NAN).as_text().as_deref(), Some("NaN"));
        assert_eq!(Value::from(f64::INFINITY).as_text().as_deref(), Some("Infinity"));
        assert_eq!(
            Value::from(f64::NEG_INFINITY).as_text().as_deref(),
            Some("-Infinity")
        );
    }

    #[test]
    fn test_from_json() {
        let node = StateNode::from_json(&json!({
            "title": "Outer",
            "count": 3,
            "ratio": 0.5,
            "done": false,
            "missing": null,
            "owner": { "name": "Ada" },
            "todos": [{ "title": "a" }, { "title": "b" }]
        }))
        .unwrap();

        assert_eq!(node.get("title"), Some(&Value::from("Outer")));
        assert_eq!(node.get("count"), Some(&Value::Integer(3)));
        assert_eq!(node.get("ratio"), Some(&Value::Float(0.5)));
        assert_eq!(node.get("done"), Some(&Value::Bool(false)));
        assert!(!node.contains_key("missing"));
        assert_eq!(
            node.get("owner").and_then(Value::as_node).and_then(|o| o.get("name")),
            Some(&Value::from("Ada"))
        );
        assert_eq!(node.get_multi_valued("todos").len(), 2);
    }

    #[test]
    fn test_from_json_rejects_scalar_lists() {
        let err = StateNode::from_json(&json!({ "tags": ["a", "b"] })).unwrap_err();
        assert_eq!(
            err,
            StateError::UnsupportedListItem {
                key: "tags".to_string(),
                index: 0,
                found: "string"
            }
        );
        assert!(matches!(
            StateNode::from_json(&json!([1, 2])),
            Err(StateError::NotAnObject { found: "array" })
        ));
    }
}
