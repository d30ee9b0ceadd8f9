//! Node store: every materialized node, grouped by entity type

use crate::node::{Node, NodeKey};
use std::collections::HashMap;

/// Nodes of one entity type, insertion ordered, indexed by id
#[derive(Debug, Clone)]
struct TypeNodes<E> {
    nodes: Vec<Node<E>>,
    index: HashMap<String, usize>,
}

impl<E> Default for TypeNodes<E> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }
}

/// Arena of nodes keyed by `(entity type, id)`
///
/// Nodes are never removed, so positions inside a type stay stable.
#[derive(Debug, Clone)]
pub struct NodeStore<E> {
    body: HashMap<String, TypeNodes<E>>,
}

impl<E> Default for NodeStore<E> {
    fn default() -> Self {
        Self {
            body: HashMap::new(),
        }
    }
}

impl<E> NodeStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity_type: &str, id: &str) -> Option<&Node<E>> {
        let nodes = self.body.get(entity_type)?;
        nodes.index.get(id).map(|&pos| &nodes.nodes[pos])
    }

    pub fn get_by_key(&self, key: &NodeKey) -> Option<&Node<E>> {
        self.get(&key.entity_type, &key.id)
    }

    pub(crate) fn get_mut(&mut self, entity_type: &str, id: &str) -> Option<&mut Node<E>> {
        let nodes = self.body.get_mut(entity_type)?;
        let pos = *nodes.index.get(id)?;
        nodes.nodes.get_mut(pos)
    }

    /// Insert a node whose id is not yet present for its type
    pub(crate) fn insert(&mut self, entity_type: &str, node: Node<E>) {
        let nodes = self.body.entry(entity_type.to_string()).or_default();
        debug_assert!(!nodes.index.contains_key(node.id()));
        nodes.index.insert(node.id().to_string(), nodes.nodes.len());
        nodes.nodes.push(node);
    }

    pub fn contains(&self, entity_type: &str, id: &str) -> bool {
        self.get(entity_type, id).is_some()
    }

    /// All nodes of a type in insertion order
    pub fn nodes(&self, entity_type: &str) -> &[Node<E>] {
        self.body
            .get(entity_type)
            .map(|n| n.nodes.as_slice())
            .unwrap_or(&[])
    }

    /// Number of nodes of a type
    pub fn count(&self, entity_type: &str) -> usize {
        self.nodes(entity_type).len()
    }

    /// Total number of nodes
    pub fn len(&self) -> usize {
        self.body.values().map(|n| n.nodes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entity types holding at least one node, sorted
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .body
            .iter()
            .filter(|(_, n)| !n.nodes.is_empty())
            .map(|(t, _)| t.as_str())
            .collect();
        types.sort_unstable();
        types
    }
}
