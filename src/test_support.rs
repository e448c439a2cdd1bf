//! Shared helpers for the in-crate test modules.

use std::sync::LazyLock;
use tracing::level_filters::LevelFilter;

use crate::state::StateNode;

static SUBSCRIBER_INIT: LazyLock<()> = LazyLock::new(|| {
    let level = match std::env::var("ENGINE_LOG").as_deref() {
        Ok("debug") => LevelFilter::DEBUG,
        Ok("trace") => LevelFilter::TRACE,
        _ => LevelFilter::WARN,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .with_target(false)
        .compact()
        .try_init()
        .ok();
});

/// Install the test log subscriber once per process.
pub fn setup() {
    LazyLock::force(&SUBSCRIBER_INIT);
}

/// `{ title, todos: [{ title: "Todo 0" }, ...] }`
pub fn todo_state(outer_title: &str, count: usize) -> StateNode {
    let mut node = StateNode::new().with("title", outer_title);
    let todos = node.multi_valued_mut("todos");
    for i in 0..count {
        todos.push(StateNode::new().with("title", format!("Todo {}", i)));
    }
    node
}
