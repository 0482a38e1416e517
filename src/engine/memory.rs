//! Deterministic in-process document engine.
//!
//! Nodes are keyed by the exact locator expression that finds them. A node can
//! be scheduled to appear only after a number of queries, which lets callers
//! model a page that renders late without touching a real clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Document, Element, EmulationLevel, EngineError, Locator};

#[derive(Debug, Default)]
struct Node {
    expression: String,
    attributes: HashMap<String, String>,
    events: Vec<(String, EmulationLevel)>,
    hidden_for: usize,
    failure: Option<String>,
}

#[derive(Debug, Default)]
struct Tree {
    nodes: Vec<Node>,
    queries: usize,
}

/// Shared, cloneable in-memory page.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    tree: Arc<Mutex<Tree>>,
}

/// Handle returned by [`MemoryDocument`]. `node == None` is the absent sentinel.
#[derive(Debug, Clone)]
pub struct MemoryElement {
    tree: Arc<Mutex<Tree>>,
    node: Option<usize>,
}

fn lock(tree: &Mutex<Tree>) -> MutexGuard<'_, Tree> {
    tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node that is visible from the first query on. Returns its id.
    pub fn insert(&self, expression: impl Into<String>) -> usize {
        self.insert_after(expression, 0)
    }

    /// Add a node that stays hidden for the first `queries` lookups and is
    /// found from query `queries + 1` onwards.
    pub fn insert_after(&self, expression: impl Into<String>, queries: usize) -> usize {
        let mut tree = lock(&self.tree);
        tree.nodes.push(Node {
            expression: expression.into(),
            hidden_for: queries,
            ..Node::default()
        });
        tree.nodes.len() - 1
    }

    pub fn set_attribute(&self, node: usize, name: &str, value: &str) {
        if let Some(n) = lock(&self.tree).nodes.get_mut(node) {
            n.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn attribute(&self, node: usize, name: &str) -> Option<String> {
        lock(&self.tree)
            .nodes
            .get(node)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    /// Events dispatched on `node`, oldest first.
    pub fn events(&self, node: usize) -> Vec<(String, EmulationLevel)> {
        lock(&self.tree)
            .nodes
            .get(node)
            .map(|n| n.events.clone())
            .unwrap_or_default()
    }

    /// Make every action on `node` fail with a script error.
    pub fn fail_actions(&self, node: usize, message: &str) {
        if let Some(n) = lock(&self.tree).nodes.get_mut(node) {
            n.failure = Some(message.to_string());
        }
    }

    /// Number of `find_element` calls served so far.
    pub fn query_count(&self) -> usize {
        lock(&self.tree).queries
    }
}

impl Document for MemoryDocument {
    type Element = MemoryElement;

    async fn find_element(&self, locator: &Locator) -> Result<MemoryElement, EngineError> {
        let mut tree = lock(&self.tree);
        tree.queries += 1;
        let query = tree.queries;
        let node = tree
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.expression == locator.expression && query > n.hidden_for)
            .map(|(i, _)| i)
            .nth(locator.position);
        Ok(MemoryElement {
            tree: Arc::clone(&self.tree),
            node,
        })
    }
}

impl MemoryElement {
    fn with_node<T>(&self, f: impl FnOnce(&mut Node) -> T) -> Result<T, EngineError> {
        let index = self.node.ok_or(EngineError::Absent)?;
        let mut tree = lock(&self.tree);
        let node = tree.nodes.get_mut(index).ok_or(EngineError::Absent)?;
        if let Some(message) = &node.failure {
            return Err(EngineError::Script(message.clone()));
        }
        Ok(f(node))
    }
}

impl Element for MemoryElement {
    fn is_absent(&self) -> bool {
        self.node.is_none()
    }

    async fn dispatch_event(&self, event: &str, emulation: EmulationLevel) -> Result<(), EngineError> {
        self.with_node(|n| n.events.push((event.to_string(), emulation)))
    }

    async fn get_attribute(&self, name: &str) -> Result<Option<String>, EngineError> {
        self.with_node(|n| n.attributes.get(name).cloned())
    }

    async fn set_attribute(&self, name: &str, value: &str) -> Result<(), EngineError> {
        self.with_node(|n| {
            n.attributes.insert(name.to_string(), value.to_string());
        })
    }
}
