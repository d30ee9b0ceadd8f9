//! Graph ingestion: flattened rows become merged entity nodes
//!
//! One row of a join result may carry columns of several entity types, each
//! prefixed with its descriptor's alias. Every registered type that finds at
//! least one of its columns in the row yields one entity, which is merged into
//! the store by `(type, id)`.

use crate::entity::{Entity, Value};
use crate::error::{Error, Result};
use crate::node::{build_id, Node};
use crate::relation::ParentRelation;
use crate::schema::{column_matches, EntityDescriptor, SchemaRegistry};
use crate::store::NodeStore;
use serde::Serialize;
use std::collections::BTreeSet;

/// One flattened result row: column label -> value
pub type Row = serde_json::Map<String, Value>;

/// What merging a node into the store did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No node with this identity existed
    Inserted,
    /// Joined into an existing node
    Merged {
        new_fields: usize,
        new_relations: usize,
    },
}

/// Counters for one ingestion call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub rows: usize,
    pub entities: usize,
    pub inserted: usize,
    pub merged: usize,
}

/// Materialize the entity a descriptor finds in a row, if any of its columns are present
///
/// Returns the entity and the attributes populated from the row.
pub fn assemble_entity<E: Entity>(
    descriptor: &EntityDescriptor,
    row: &Row,
) -> Result<Option<(E, BTreeSet<String>)>> {
    let alias = descriptor.alias().ok_or_else(|| {
        Error::config(format!("No alias found for table '{}'", descriptor.table))
    })?;
    let entity_type = descriptor.entity_type.as_deref().ok_or_else(|| {
        Error::config(format!("No entity type found for table '{}'", descriptor.table))
    })?;

    let mut entity: Option<E> = None;
    let mut loaded = BTreeSet::new();
    for (label, value) in row {
        for col in descriptor.mapped_columns() {
            if !column_matches(label, alias, &col.name) {
                continue;
            }
            if entity.is_none() {
                entity = Some(E::instantiate(entity_type)?);
            }
            if let Some(target) = entity.as_mut() {
                target.write(col.attribute(), value.clone())?;
                loaded.insert(col.attribute().to_string());
            }
        }
    }
    Ok(entity.map(|e| (e, loaded)))
}

/// Compute identity and parent edges for a freshly assembled entity
pub fn build_node<E: Entity>(
    descriptor: &EntityDescriptor,
    entity: E,
    loaded_fields: BTreeSet<String>,
) -> Result<Node<E>> {
    let pk_values = descriptor
        .primary_key_columns()
        .map(|col| entity.read(col.attribute()))
        .collect::<Result<Vec<Value>>>()?;
    if pk_values.is_empty() {
        return Err(Error::config(format!(
            "No primary key found for '{}'",
            descriptor.name()
        )));
    }
    let id = build_id(&pk_values).ok_or_else(|| {
        Error::config(format!(
            "Primary key of '{}' is null in the loaded row",
            descriptor.name()
        ))
    })?;

    let mut relations = Vec::new();
    for fk in &descriptor.foreign_keys {
        let mut values = Vec::with_capacity(fk.columns.len());
        for column in &fk.columns {
            let attribute = descriptor
                .column(column)
                .map(|c| c.attribute())
                .unwrap_or(column.as_str());
            values.push(entity.read(attribute)?);
        }
        if let Some(parent_id) = build_id(&values) {
            let relation = ParentRelation::new(fk.parent_type.as_str(), parent_id, &fk.columns);
            if !relations.contains(&relation) {
                relations.push(relation);
            }
        }
    }

    Ok(Node::new(id, entity, loaded_fields, relations))
}

/// Add a node to the store, or join it into the node already holding its identity
///
/// Attributes already loaded on the existing node are never overwritten.
pub fn merge_node<E: Entity>(
    store: &mut NodeStore<E>,
    entity_type: &str,
    node: Node<E>,
) -> Result<MergeOutcome> {
    let Some(existing) = store.get_mut(entity_type, node.id()) else {
        store.insert(entity_type, node);
        return Ok(MergeOutcome::Inserted);
    };

    let (entity, loaded_fields, relations) = node.into_parts();
    let mut new_fields = 0;
    for field in &loaded_fields {
        if existing.is_loaded(field) {
            continue;
        }
        let value = entity.read(field)?;
        existing.entity_mut().write(field, value)?;
        existing.mark_loaded(field);
        new_fields += 1;
    }

    let mut new_relations = 0;
    for relation in relations {
        if existing.add_relation(relation) {
            new_relations += 1;
        }
    }

    Ok(MergeOutcome::Merged {
        new_fields,
        new_relations,
    })
}

/// Ingest one row against every registered descriptor
pub fn ingest_row<E: Entity>(
    registry: &SchemaRegistry,
    store: &mut NodeStore<E>,
    row: &Row,
    stats: &mut IngestStats,
) -> Result<()> {
    for descriptor in registry.iter() {
        let Some((entity, loaded)) = assemble_entity::<E>(descriptor, row)? else {
            continue;
        };
        let node = build_node(descriptor, entity, loaded)?;
        tracing::trace!("Assembled {}({})", descriptor.name(), node.id());

        stats.entities += 1;
        match merge_node(store, descriptor.name(), node)? {
            MergeOutcome::Inserted => stats.inserted += 1,
            MergeOutcome::Merged { .. } => stats.merged += 1,
        }
    }
    stats.rows += 1;
    Ok(())
}
