//! The in-memory net: registry, node store and traversal cache together

use crate::cache::TraversalCache;
use crate::entity::{Entity, Record};
use crate::error::{Error, Result};
use crate::ingest::{ingest_row, IngestStats, Row};
use crate::limits::{MAX_PATH_LEVEL, MAX_UNCACHED_RESULT};
use crate::node::{build_id, Node, NodeKey};
use crate::path::Path;
use crate::schema::{EntityDescriptor, SchemaRegistry};
use crate::store::NodeStore;
use crate::traversal::{PathResult, TraversalEngine, TraversalStats};
use serde::{Deserialize, Serialize};

/// Net-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Global switch for the traversal cache
    pub cacheable: bool,

    /// Deepest chain level evaluated before failing
    pub max_path_level: usize,

    /// Largest selection allowed for an uncacheable step without a unique id
    pub max_uncached_result: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            cacheable: true,
            max_path_level: MAX_PATH_LEVEL,
            max_uncached_result: MAX_UNCACHED_RESULT,
        }
    }
}

/// Entity graph built from flat rows
///
/// Writes (ingestion, registration) drop every cached step result.
#[derive(Debug, Clone)]
pub struct TinyNet<E: Entity = Record> {
    config: NetConfig,
    registry: SchemaRegistry,
    store: NodeStore<E>,
    cache: TraversalCache,
    last_stats: TraversalStats,
}

impl<E: Entity> Default for TinyNet<E> {
    fn default() -> Self {
        Self::with_config(NetConfig::default())
    }
}

impl<E: Entity> TinyNet<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: NetConfig) -> Self {
        Self {
            config,
            registry: SchemaRegistry::new(),
            store: NodeStore::new(),
            cache: TraversalCache::new(),
            last_stats: TraversalStats::default(),
        }
    }

    /// Build a net from rows in one call
    pub fn from_rows(rows: &[Row], descriptors: &[EntityDescriptor]) -> Result<Self> {
        let mut net = Self::new();
        net.ingest(rows, descriptors)?;
        Ok(net)
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Register descriptors without loading rows
    ///
    /// Every descriptor is validated before any is registered.
    pub fn register(&mut self, descriptors: &[EntityDescriptor]) -> Result<()> {
        self.cache.clear();
        for descriptor in descriptors {
            descriptor.validate()?;
        }
        for descriptor in descriptors {
            self.registry.register(descriptor)?;
        }
        Ok(())
    }

    /// Register descriptors and merge rows into the store
    ///
    /// Rows are applied in order; on failure the rows before the failing one
    /// stay merged.
    pub fn ingest(&mut self, rows: &[Row], descriptors: &[EntityDescriptor]) -> Result<IngestStats> {
        self.register(descriptors)?;

        let mut stats = IngestStats::default();
        for row in rows {
            ingest_row(&self.registry, &mut self.store, row, &mut stats)?;
        }
        tracing::debug!(
            "Ingested {} rows: {} entities, {} new nodes, {} merged",
            stats.rows,
            stats.entities,
            stats.inserted,
            stats.merged
        );
        Ok(stats)
    }

    /// Total number of nodes
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn node_count(&self, entity_type: &str) -> usize {
        self.store.count(entity_type)
    }

    /// Entity types holding at least one node, sorted
    pub fn types(&self) -> Vec<&str> {
        self.store.types()
    }

    pub fn nodes(&self, entity_type: &str) -> &[Node<E>] {
        self.store.nodes(entity_type)
    }

    pub fn node(&self, entity_type: &str, id: &str) -> Option<&Node<E>> {
        self.store.get(entity_type, id)
    }

    pub fn store(&self) -> &NodeStore<E> {
        &self.store
    }

    /// Entities of a type, in insertion order
    pub fn entities(&self, entity_type: &str) -> impl Iterator<Item = &E> {
        self.store.nodes(entity_type).iter().map(Node::entity)
    }

    pub fn entity_list(&self, entity_type: &str) -> Vec<E> {
        self.entities(entity_type).cloned().collect()
    }

    pub fn descriptor(&self, entity_type: &str) -> Option<&EntityDescriptor> {
        self.registry.get(entity_type)
    }

    pub fn descriptor_for_table(&self, table: &str) -> Option<&EntityDescriptor> {
        self.registry.by_table(table)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.registry.iter()
    }

    /// Identity of a caller-held entity, from its type tag and primary key
    pub fn node_key_of(&self, entity: &E) -> Result<NodeKey> {
        let entity_type = entity.entity_type();
        let descriptor = self.registry.get(entity_type).ok_or_else(|| {
            Error::query(format!("No descriptor registered for entity type '{}'", entity_type))
        })?;
        let values = descriptor
            .primary_key_columns()
            .map(|col| entity.read(col.attribute()))
            .collect::<Result<Vec<_>>>()?;
        let id = build_id(&values).ok_or_else(|| {
            Error::config(format!("Entity of type '{}' has no primary key value", entity_type))
        })?;
        Ok(NodeKey::new(entity_type, id))
    }

    /// Stored node for a caller-held entity, if it was ingested
    pub fn node_of(&self, entity: &E) -> Result<Option<&Node<E>>> {
        let key = self.node_key_of(entity)?;
        Ok(self.store.get_by_key(&key))
    }

    /// Evaluate a path chain from explicit input nodes
    pub fn evaluate(&mut self, path: &Path<E>, input: &[NodeKey]) -> Result<PathResult> {
        let mut engine = TraversalEngine::new(&self.registry, &self.store, &mut self.cache, &self.config);
        let result = engine.evaluate(path, input);
        self.last_stats = engine.into_stats();
        result
    }

    /// Evaluate a path chain with no input; its head must be a select step
    pub fn evaluate_all(&mut self, path: &Path<E>) -> Result<PathResult> {
        self.evaluate(path, &[])
    }

    /// Evaluate starting from caller-held entities
    ///
    /// Entities that were never ingested contribute no input.
    pub fn find_for_entities(&mut self, path: &Path<E>, entities: &[E]) -> Result<PathResult> {
        let mut input = Vec::with_capacity(entities.len());
        for entity in entities {
            let key = self.node_key_of(entity)?;
            if self.store.get_by_key(&key).is_some() {
                input.push(key);
            }
        }
        self.evaluate(path, &input)
    }

    /// Entities of one type selected by a path, cloned, in selection order
    pub fn find_entities(&mut self, entity_type: &str, path: &Path<E>, entities: &[E]) -> Result<Vec<E>> {
        let result = self.find_for_entities(path, entities)?;
        Ok(self.resolve_entities(entity_type, &result))
    }

    /// Entities behind the ids a result selected for a type
    pub fn resolve_entities(&self, entity_type: &str, result: &PathResult) -> Vec<E> {
        result
            .ids(entity_type)
            .into_iter()
            .filter_map(|id| self.store.get(entity_type, id))
            .map(|node| node.entity().clone())
            .collect()
    }

    pub fn cacheable(&self) -> bool {
        self.config.cacheable
    }

    pub fn set_cacheable(&mut self, cacheable: bool) {
        self.config.cacheable = cacheable;
    }

    /// Number of cached step results
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn last_stats(&self) -> &TraversalStats {
        &self.last_stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDescriptor;
    use serde_json::json;

    fn users() -> EntityDescriptor {
        EntityDescriptor::new("users")
            .with_entity_type("User")
            .with_alias("u")
            .with_column(ColumnDescriptor::new("id").with_primary_key())
            .with_column(ColumnDescriptor::new("name"))
    }

    fn rows(values: Vec<serde_json::Value>) -> Vec<Row> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }

    #[test]
    fn test_config_defaults_from_toml() {
        let config: NetConfig = toml::from_str("cacheable = false").unwrap();
        assert!(!config.cacheable);
        assert_eq!(config.max_path_level, MAX_PATH_LEVEL);
        assert_eq!(config.max_uncached_result, MAX_UNCACHED_RESULT);
    }

    #[test]
    fn test_from_rows_and_lookup() {
        let net: TinyNet = TinyNet::from_rows(
            &rows(vec![json!({"u_id": 1, "u_name": "a"}), json!({"u_id": 2, "u_name": "b"})]),
            &[users()],
        )
        .unwrap();

        assert_eq!(net.len(), 2);
        assert_eq!(net.types(), vec!["User"]);
        assert_eq!(net.node_count("User"), 2);
        assert_eq!(net.node_count("Order"), 0);
        assert!(net.descriptor_for_table("USERS").is_some());

        let names: Vec<_> = net.entities("User").filter_map(|u| u.get("name")).collect();
        assert_eq!(names, vec![&json!("a"), &json!("b")]);

        let lookup = Record::new("User").with("id", 2);
        assert_eq!(net.node_key_of(&lookup).unwrap(), NodeKey::new("User", "2"));
        assert!(net.node_of(&lookup).unwrap().is_some());
        assert!(net
            .node_of(&Record::new("User").with("id", 9))
            .unwrap()
            .is_none());
        assert!(net.node_key_of(&Record::new("Invoice")).is_err());
    }

    #[test]
    fn test_writes_clear_cache() {
        let mut net: TinyNet = TinyNet::from_rows(&rows(vec![json!({"u_id": 1})]), &[users()]).unwrap();
        let path = Path::new("S+", "User");

        net.evaluate_all(&path).unwrap();
        assert_eq!(net.cache_len(), 1);

        net.ingest(&rows(vec![json!({"u_id": 2})]), &[]).unwrap();
        assert_eq!(net.cache_len(), 0);

        let result = net.evaluate_all(&path).unwrap();
        assert_eq!(result.ids("User"), vec!["1", "2"]);

        net.register(&[users()]).unwrap();
        assert_eq!(net.cache_len(), 0);
    }

    #[test]
    fn test_global_cache_switch() {
        let mut net: TinyNet = TinyNet::from_rows(&rows(vec![json!({"u_id": 1})]), &[users()]).unwrap();
        net.set_cacheable(false);
        assert!(!net.cacheable());

        net.evaluate_all(&Path::new("S+", "User")).unwrap();
        assert_eq!(net.cache_len(), 0);
        assert_eq!(net.last_stats().cache_writes, 0);
        assert_eq!(net.last_stats().validator_calls, 1);
    }

    #[test]
    fn test_register_rejects_invalid_batch() {
        let mut net: TinyNet = TinyNet::new();
        let broken = EntityDescriptor::new("orders");

        assert!(net.register(&[users(), broken]).is_err());
        assert!(net.descriptor("User").is_none());
    }
}
