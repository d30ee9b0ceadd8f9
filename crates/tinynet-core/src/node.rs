//! Nodes, node keys, node sets and identity strings

use crate::entity::Value;
use crate::relation::ParentRelation;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeSet, HashSet};

/// Joins the rendered values of a compound key into one identity string
pub const COMPOUND_VALUE_SEPARATOR: &str = "_CmPdValSpr_";

/// Render a scalar for use in an identity string; `None` for null
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Build an identity string from key values in key order
///
/// Returns `None` when any value is null.
pub fn build_id<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut parts = Vec::new();
    for value in values {
        parts.push(render_value(value)?);
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join(COMPOUND_VALUE_SEPARATOR))
}

/// Address of a node in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub entity_type: String,
    pub id: String,
}

impl NodeKey {
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.entity_type, self.id)
    }
}

/// A materialized entity with its identity, loaded attributes and parent edges
#[derive(Debug, Clone)]
pub struct Node<E> {
    id: String,
    entity: E,
    loaded_fields: BTreeSet<String>,
    parent_relations: Vec<ParentRelation>,
}

impl<E> Node<E> {
    pub fn new(
        id: impl Into<String>,
        entity: E,
        loaded_fields: BTreeSet<String>,
        parent_relations: Vec<ParentRelation>,
    ) -> Self {
        Self {
            id: id.into(),
            entity,
            loaded_fields,
            parent_relations,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub(crate) fn entity_mut(&mut self) -> &mut E {
        &mut self.entity
    }

    /// Attributes populated from some row so far
    pub fn loaded_fields(&self) -> &BTreeSet<String> {
        &self.loaded_fields
    }

    pub fn is_loaded(&self, attribute: &str) -> bool {
        self.loaded_fields.contains(attribute)
    }

    pub(crate) fn mark_loaded(&mut self, attribute: &str) {
        self.loaded_fields.insert(attribute.to_string());
    }

    pub fn parent_relations(&self) -> &[ParentRelation] {
        &self.parent_relations
    }

    /// Add an edge unless an equal one is already held
    pub(crate) fn add_relation(&mut self, relation: ParentRelation) -> bool {
        if self.parent_relations.contains(&relation) {
            return false;
        }
        self.parent_relations.push(relation);
        true
    }

    /// Is this node a child of the given parent through exactly `columns`?
    pub fn is_child_of(&self, parent_type: &str, parent_id: &str, columns: &BTreeSet<String>) -> bool {
        self.parent_relations
            .iter()
            .any(|r| r.references(parent_type, parent_id, columns))
    }

    pub(crate) fn into_parts(self) -> (E, BTreeSet<String>, Vec<ParentRelation>) {
        (self.entity, self.loaded_fields, self.parent_relations)
    }
}

/// Insertion-ordered set of node ids of a single entity type
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    ids: Vec<String>,
    seen: HashSet<String>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an id, returning `false` if it was already present
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.seen.contains(&id) {
            return false;
        }
        self.seen.insert(id.clone());
        self.ids.push(id);
        true
    }

    pub fn extend_from(&mut self, other: &NodeSet) {
        for id in &other.ids {
            self.insert(id.as_str());
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.ids.iter()
    }
}

impl PartialEq for NodeSet {
    fn eq(&self, other: &Self) -> bool {
        self.seen == other.seen
    }
}

impl Eq for NodeSet {}

impl<S: Into<String>> FromIterator<S> for NodeSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = NodeSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

impl Serialize for NodeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_id() {
        assert_eq!(build_id([&json!(1)]), Some("1".to_string()));
        assert_eq!(build_id([&json!("1")]), Some("1".to_string()));
        assert_eq!(
            build_id([&json!(7), &json!("a")]),
            Some(format!("7{}a", COMPOUND_VALUE_SEPARATOR))
        );
        assert_eq!(build_id([&json!(1), &Value::Null]), None);
        assert_eq!(build_id(std::iter::empty::<&Value>()), None);
    }

    #[test]
    fn test_node_relations_are_a_set() {
        let mut node = Node::new("10", (), BTreeSet::new(), Vec::new());
        assert!(node.add_relation(ParentRelation::new("User", "1", ["buyerId"])));
        assert!(!node.add_relation(ParentRelation::new("User", "1", ["buyerId"])));
        assert!(node.add_relation(ParentRelation::new("User", "1", ["sellerId"])));
        assert_eq!(node.parent_relations().len(), 2);

        let buyer = crate::relation::column_set(["buyerId"]);
        assert!(node.is_child_of("User", "1", &buyer));
        assert!(!node.is_child_of("User", "2", &buyer));
    }

    #[test]
    fn test_node_set_keeps_insertion_order() {
        let mut set = NodeSet::new();
        assert!(set.insert("b"));
        assert!(set.insert("a"));
        assert!(!set.insert("b"));

        let ids: Vec<&str> = set.iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(set, ["a", "b"].into_iter().collect::<NodeSet>());
        assert_eq!(serde_json::to_value(&set).unwrap(), json!(["b", "a"]));
    }
}
