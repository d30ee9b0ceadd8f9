//! Path evaluation over the node store

use crate::cache::TraversalCache;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::expression::Expr;
use crate::limits::{validate_path_level, validate_selected_size, ROOT_ORIGIN};
use crate::net::NetConfig;
use crate::node::{Node, NodeKey, NodeSet};
use crate::path::{Mode, Path, Target};
use crate::schema::{EntityDescriptor, SchemaRegistry};
use crate::store::NodeStore;
use crate::validator::{DefaultValidator, Validator};
use serde::Serialize;
use std::collections::BTreeMap;

/// Accumulated output of a path evaluation, keyed by entity type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathResult {
    selected: BTreeMap<String, NodeSet>,
}

impl PathResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity_type: &str) -> Option<&NodeSet> {
        self.selected.get(entity_type)
    }

    /// Ids selected for a type, empty if the type was never accumulated
    pub fn ids(&self, entity_type: &str) -> Vec<&str> {
        self.get(entity_type)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, entity_type: &str, id: &str) -> bool {
        self.get(entity_type).is_some_and(|set| set.contains(id))
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.selected.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeSet)> {
        self.selected.iter().map(|(t, set)| (t.as_str(), set))
    }

    /// Total number of selected nodes across all types
    pub fn total(&self) -> usize {
        self.selected.values().map(NodeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    fn accumulate(&mut self, entity_type: &str, selected: &NodeSet) {
        self.selected
            .entry(entity_type.to_string())
            .or_default()
            .extend_from(selected);
    }
}

/// Counters for the latest evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraversalStats {
    pub steps: usize,
    pub candidates_checked: usize,
    pub validator_calls: usize,
    pub cache_hits: usize,
    pub cache_writes: usize,
    pub max_level_reached: usize,
}

/// Evaluates path chains against a borrowed store
pub struct TraversalEngine<'a, E: Entity> {
    registry: &'a SchemaRegistry,
    store: &'a NodeStore<E>,
    cache: &'a mut TraversalCache,
    config: &'a NetConfig,
    stats: TraversalStats,
}

impl<'a, E: Entity> TraversalEngine<'a, E> {
    pub fn new(
        registry: &'a SchemaRegistry,
        store: &'a NodeStore<E>,
        cache: &'a mut TraversalCache,
        config: &'a NetConfig,
    ) -> Self {
        Self {
            registry,
            store,
            cache,
            config,
            stats: TraversalStats::default(),
        }
    }

    pub fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    pub fn into_stats(self) -> TraversalStats {
        self.stats
    }

    /// Evaluate a chain starting from `input`
    ///
    /// Each step feeds its selection to the next one; steps whose kind ends
    /// in `+` also add their selection to the returned result.
    pub fn evaluate(&mut self, path: &Path<E>, input: &[NodeKey]) -> Result<PathResult> {
        let mut result = PathResult::new();
        let mut input = input.to_vec();
        let mut step = Some(path);
        let mut level = 0;

        while let Some(current) = step {
            let (target_type, selected) = self.evaluate_step(level, current, &input)?;
            self.stats.steps += 1;
            self.stats.max_level_reached = level;

            if current.step_kind()?.accumulate {
                result.accumulate(&target_type, &selected);
            }

            input = selected
                .iter()
                .map(|id| NodeKey::new(target_type.as_str(), id.as_str()))
                .collect();
            step = current.next();
            level += 1;
        }

        tracing::debug!(
            "Evaluated {} steps, {} nodes selected, {} cache hits",
            self.stats.steps,
            result.total(),
            self.stats.cache_hits
        );
        Ok(result)
    }

    fn resolve(&self, target: &Target) -> Result<&'a EntityDescriptor> {
        let descriptor = match target {
            Target::Entity(name) => self.registry.get(name),
            Target::Table(name) => self.registry.by_table(name),
        };
        descriptor.ok_or_else(|| Error::query(format!("Path target '{}' is not registered", target)))
    }

    fn evaluate_step(
        &mut self,
        level: usize,
        path: &Path<E>,
        input: &[NodeKey],
    ) -> Result<(String, NodeSet)> {
        if path.target().as_str().is_empty() {
            return Err(Error::query("Path target is empty"));
        }
        let target_type = self.resolve(path.target())?.name().to_string();
        validate_path_level(level, self.config.max_path_level)?;
        let kind = path.step_kind()?;

        let filter = path.filter().map(Expr::parse).transpose()?;
        let unique_id = path.unique_id();
        let store = self.store;
        let use_cache = self.config.cacheable && path.is_cacheable() && !unique_id.is_empty();

        let selected = match kind.mode {
            Mode::Select => {
                if level != 0 {
                    return Err(Error::query(format!(
                        "Path type '{}' on '{}' selects from the whole store and may only start a chain",
                        path.kind(),
                        path.target()
                    )));
                }
                let cached = if use_cache {
                    self.cache.get(ROOT_ORIGIN, &unique_id)
                } else {
                    None
                };
                match cached {
                    Some(hit) => {
                        tracing::trace!("Cache hit for {} at ROOT", target_type);
                        self.stats.cache_hits += 1;
                        (*hit).clone()
                    }
                    None => {
                        let candidates = store.nodes(&target_type).iter();
                        let mut selected = NodeSet::new();
                        self.select(level, path, filter.as_ref(), candidates, &mut selected)?;
                        if use_cache {
                            self.cache.put(ROOT_ORIGIN, &unique_id, selected.clone());
                            self.stats.cache_writes += 1;
                        }
                        selected
                    }
                }
            }
            Mode::Children => {
                // A custom checker sees the step-wide count, so its per-parent
                // result is only reusable after an equally sized selection.
                let counts_selected = path.checker().is_some();
                let mut selected = NodeSet::new();
                for parent in input {
                    let origin = parent.to_string();
                    let cache_key = if counts_selected && !selected.is_empty() {
                        format!("{}#{}", unique_id, selected.len())
                    } else {
                        unique_id.clone()
                    };
                    if use_cache {
                        if let Some(hit) = self.cache.get(&origin, &cache_key) {
                            tracing::trace!("Cache hit for {} under {}", target_type, origin);
                            self.stats.cache_hits += 1;
                            selected.extend_from(&hit);
                            continue;
                        }
                    }
                    let candidates = store
                        .nodes(&target_type)
                        .iter()
                        .filter(|node| node.is_child_of(&parent.entity_type, &parent.id, path.columns()));
                    let children = self.select(level, path, filter.as_ref(), candidates, &mut selected)?;
                    if use_cache {
                        self.cache.put(&origin, &cache_key, children);
                        self.stats.cache_writes += 1;
                    }
                }
                selected
            }
        };

        if !path.is_cacheable() && unique_id.is_empty() {
            validate_selected_size(&target_type, selected.len(), self.config.max_uncached_result)?;
        }

        tracing::trace!(
            "Level {} {} on {} selected {} nodes",
            level,
            path.kind(),
            target_type,
            selected.len()
        );
        Ok((target_type, selected))
    }

    /// Run the step's validator over candidates, in store order
    ///
    /// Accepted nodes join `selected`, the step's whole selection so far, whose
    /// size is the count validators see. Returns the nodes accepted by this call.
    fn select<'n, I>(
        &mut self,
        level: usize,
        path: &Path<E>,
        filter: Option<&Expr>,
        candidates: I,
        selected: &mut NodeSet,
    ) -> Result<NodeSet>
    where
        I: Iterator<Item = &'n Node<E>>,
        E: 'n,
    {
        let checker: &dyn Validator<E> = match path.checker() {
            Some(checker) => checker,
            None => &DefaultValidator,
        };
        let mut accepted = NodeSet::new();
        for node in candidates {
            self.stats.candidates_checked += 1;
            self.stats.validator_calls += 1;
            if checker.accept(self.store, node, level, selected.len())
                && checker.matches(node.entity(), filter, selected.len())?
            {
                selected.insert(node.id());
                accepted.insert(node.id());
            }
        }
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Record;
    use crate::ingest::{ingest_row, IngestStats, Row};
    use crate::schema::{ColumnDescriptor, ForeignKey};
    use crate::validator::FirstN;
    use serde_json::json;

    struct Fixture {
        registry: SchemaRegistry,
        store: NodeStore<Record>,
        cache: TraversalCache,
        config: NetConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = SchemaRegistry::new();
            registry
                .register(
                    &EntityDescriptor::new("users")
                        .with_entity_type("User")
                        .with_alias("u")
                        .with_column(ColumnDescriptor::new("id").with_primary_key())
                        .with_column(ColumnDescriptor::new("name")),
                )
                .unwrap();
            registry
                .register(
                    &EntityDescriptor::new("orders")
                        .with_entity_type("Order")
                        .with_alias("o")
                        .with_column(ColumnDescriptor::new("id").with_primary_key())
                        .with_column(ColumnDescriptor::new("user_id").with_attribute("userId"))
                        .with_foreign_key(ForeignKey::new(["user_id"], "User")),
                )
                .unwrap();

            let mut store = NodeStore::new();
            let mut stats = IngestStats::default();
            for value in [
                json!({"u_id": 1, "u_name": "a", "o_id": 10, "o_user_id": 1}),
                json!({"u_id": 1, "u_name": "a", "o_id": 11, "o_user_id": 1}),
                json!({"u_id": 2, "u_name": "b", "o_id": 12, "o_user_id": 2}),
            ] {
                let row: Row = serde_json::from_value(value).unwrap();
                ingest_row(&registry, &mut store, &row, &mut stats).unwrap();
            }

            Self {
                registry,
                store,
                cache: TraversalCache::new(),
                config: NetConfig::default(),
            }
        }

        fn engine(&mut self) -> TraversalEngine<'_, Record> {
            TraversalEngine::new(&self.registry, &self.store, &mut self.cache, &self.config)
        }
    }

    #[test]
    fn test_select_then_children() {
        let mut fixture = Fixture::new();
        let path: Path = Path::new("S-", "User")
            .with_filter("name = 'a'")
            .then(Path::new("C+", "Order").with_columns(["user_id"]));

        let result = fixture.engine().evaluate(&path, &[]).unwrap();

        assert!(result.get("User").is_none());
        assert_eq!(result.ids("Order"), vec!["10", "11"]);
    }

    #[test]
    fn test_children_from_explicit_input() {
        let mut fixture = Fixture::new();
        let path: Path = Path::new("C+", "Order").with_columns(["user_id"]);

        let result = fixture
            .engine()
            .evaluate(&path, &[NodeKey::new("User", "2")])
            .unwrap();
        assert_eq!(result.ids("Order"), vec!["12"]);

        let empty = fixture.engine().evaluate(&path, &[]).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_children_require_matching_columns() {
        let mut fixture = Fixture::new();
        let path: Path = Path::new("C+", "Order").with_columns(["id"]);

        let result = fixture
            .engine()
            .evaluate(&path, &[NodeKey::new("User", "1")])
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_select_past_head_is_rejected() {
        let mut fixture = Fixture::new();
        let path: Path = Path::new("S-", "User").then(Path::new("S+", "Order"));

        let err = fixture.engine().evaluate(&path, &[]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Query);
    }

    #[test]
    fn test_unknown_target_and_kind() {
        let mut fixture = Fixture::new();

        let unknown: Path = Path::new("S+", "Invoice");
        assert!(fixture.engine().evaluate(&unknown, &[]).is_err());

        let bad_kind: Path = Path::new("X+", "User");
        assert!(fixture.engine().evaluate(&bad_kind, &[]).is_err());

        let by_table: Path = Path::new("S+", Target::table("USERS"));
        let result = fixture.engine().evaluate(&by_table, &[]).unwrap();
        assert_eq!(result.ids("User"), vec!["1", "2"]);
    }

    #[test]
    fn test_cache_serves_repeat_evaluation() {
        let mut fixture = Fixture::new();
        let path: Path = Path::new("S-", "User").then(Path::new("C+", "Order").with_columns(["user_id"]));

        let mut engine = fixture.engine();
        let first = engine.evaluate(&path, &[]).unwrap();
        assert_eq!(engine.stats().cache_writes, 3);

        let mut engine = fixture.engine();
        let second = engine.evaluate(&path, &[]).unwrap();
        let stats = engine.into_stats();

        assert_eq!(first, second);
        assert_eq!(stats.cache_hits, 3);
        assert_eq!(stats.validator_calls, 0);
        assert_eq!(fixture.cache.len(), 3);
    }

    #[test]
    fn test_first_n_caps_whole_step() {
        let mut fixture = Fixture::new();
        let path: Path = Path::new("S-", "User").then(
            Path::new("C+", "Order")
                .with_columns(["user_id"])
                .with_checker(FirstN(1)),
        );

        let result = fixture.engine().evaluate(&path, &[]).unwrap();
        assert_eq!(result.ids("Order"), vec!["10"]);

        // replayed from cache, in the same input order
        let mut engine = fixture.engine();
        let replay = engine.evaluate(&path, &[]).unwrap();
        assert_eq!(replay, result);
        assert_eq!(engine.stats().validator_calls, 0);

        // the second parent alone still gets its own first child
        let alone: Path = Path::new("C+", "Order")
            .with_columns(["user_id"])
            .with_checker(FirstN(1));
        let result = fixture
            .engine()
            .evaluate(&alone, &[NodeKey::new("User", "2")])
            .unwrap();
        assert_eq!(result.ids("Order"), vec!["12"]);
    }

    #[test]
    fn test_first_n_counts_across_parents() {
        let mut fixture = Fixture::new();
        let path: Path = Path::new("C+", "Order")
            .with_columns(["user_id"])
            .with_checker(FirstN(2));

        let result = fixture
            .engine()
            .evaluate(&path, &[NodeKey::new("User", "2"), NodeKey::new("User", "1")])
            .unwrap();
        assert_eq!(result.ids("Order"), vec!["12", "10"]);
    }

    #[test]
    fn test_size_guard_on_uncached_steps() {
        struct Opaque;
        impl Validator<Record> for Opaque {}

        let mut fixture = Fixture::new();
        fixture.config.max_uncached_result = 1;

        let guarded: Path = Path::new("S+", "User").with_cacheable(false).with_checker(Opaque);
        assert!(fixture.engine().evaluate(&guarded, &[]).is_err());

        // a cacheable step or one with a unique id is not subject to the guard
        let keyed: Path = Path::new("S+", "User").with_cacheable(false);
        assert!(fixture.engine().evaluate(&keyed, &[]).is_ok());
    }
}
