//! Parent relation (edge) between a child node and its parent node

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Normalize foreign-key column names for comparison
pub fn column_set<I, S>(columns: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    columns
        .into_iter()
        .map(|c| c.as_ref().to_ascii_lowercase())
        .collect()
}

/// "This node references a parent node through this foreign-key column set"
///
/// Edges hold the parent's identity, never the parent itself, so a node graph
/// with back references needs no shared ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParentRelation {
    /// Entity type of the parent
    pub parent_type: String,

    /// Identity string of the parent node
    pub parent_id: String,

    /// Foreign-key columns on the child, lowercased
    pub columns: BTreeSet<String>,
}

impl ParentRelation {
    pub fn new<I, S>(parent_type: impl Into<String>, parent_id: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            parent_type: parent_type.into(),
            parent_id: parent_id.into(),
            columns: column_set(columns),
        }
    }

    /// Does this edge point at the given parent through exactly `columns`?
    pub fn references(&self, parent_type: &str, parent_id: &str, columns: &BTreeSet<String>) -> bool {
        self.parent_id == parent_id && self.parent_type == parent_type && &self.columns == columns
    }
}
