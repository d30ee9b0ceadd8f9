//! Memoized step results keyed by origin and path
//!
//! Step unique ids are interned to small integers the first time they are
//! cached; ids start at 1 and are never reused until the cache is cleared.

use crate::node::NodeSet;
use std::collections::HashMap;
use std::rc::Rc;

/// Results of cacheable steps, per origin then per interned path id
#[derive(Debug, Clone, Default)]
pub struct TraversalCache {
    entries: HashMap<String, HashMap<u32, Rc<NodeSet>>>,
    path_ids: HashMap<String, u32>,
}

impl TraversalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interned id of a step unique id, if it was ever cached
    pub fn path_id(&self, unique_id: &str) -> Option<u32> {
        self.path_ids.get(unique_id).copied()
    }

    fn intern(&mut self, unique_id: &str) -> u32 {
        if let Some(id) = self.path_ids.get(unique_id) {
            return *id;
        }
        let id = self.path_ids.len() as u32 + 1;
        self.path_ids.insert(unique_id.to_string(), id);
        id
    }

    pub fn get(&self, origin: &str, unique_id: &str) -> Option<Rc<NodeSet>> {
        let path_id = self.path_id(unique_id)?;
        self.entries.get(origin)?.get(&path_id).cloned()
    }

    /// Store a step result, replacing any previous one for the same key
    pub fn put(&mut self, origin: &str, unique_id: &str, selected: NodeSet) -> Rc<NodeSet> {
        let path_id = self.intern(unique_id);
        let selected = Rc::new(selected);
        self.entries
            .entry(origin.to_string())
            .or_default()
            .insert(path_id, Rc::clone(&selected));
        selected
    }

    /// Number of cached (origin, path) results
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        if !self.is_empty() {
            tracing::debug!("Clearing {} cached step results", self.len());
        }
        self.entries.clear();
        self.path_ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let mut cache = TraversalCache::new();
        let set: NodeSet = ["1", "2"].into_iter().collect();

        assert!(cache.get("ROOT", "S+|User").is_none());
        cache.put("ROOT", "S+|User", set.clone());

        assert_eq!(cache.get("ROOT", "S+|User").as_deref(), Some(&set));
        assert!(cache.get("User(1)", "S+|User").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_path_ids_are_sequential() {
        let mut cache = TraversalCache::new();
        cache.put("ROOT", "a", NodeSet::new());
        cache.put("ROOT", "b", NodeSet::new());
        cache.put("x", "a", NodeSet::new());

        assert_eq!(cache.path_id("a"), Some(1));
        assert_eq!(cache.path_id("b"), Some(2));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_clear() {
        let mut cache = TraversalCache::new();
        cache.put("ROOT", "a", NodeSet::new());
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.path_id("a").is_none());
    }
}
