//! Entity type descriptors and the schema registry
//!
//! Descriptors are supplied by whatever owns the relational metadata. The net
//! only reads them to find primary keys, foreign-key groups and the alias used
//! to pick an entity's columns out of a flattened join row.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One column of an entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Storage (column) name
    pub name: String,

    /// Entity attribute this column maps to; defaults to the column name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    /// Part of the primary key
    #[serde(default)]
    pub primary_key: bool,

    /// Excluded from row mapping
    #[serde(default)]
    pub transient: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: None,
            primary_key: false,
            transient: false,
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn with_primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn with_transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Attribute name used with the entity accessor
    pub fn attribute(&self) -> &str {
        self.attribute.as_deref().unwrap_or(&self.name)
    }
}

/// A foreign-key column group pointing at a parent entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Child-side column names, in key order
    pub columns: Vec<String>,

    /// Entity type of the referenced parent
    pub parent_type: String,

    /// Referenced parent columns (informational, must match `columns` in length)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_columns: Vec<String>,
}

impl ForeignKey {
    pub fn new<I, S>(columns: I, parent_type: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            parent_type: parent_type.into(),
            parent_columns: Vec::new(),
        }
    }

    pub fn with_parent_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Metadata for one entity type (a table mapped to an entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Table name
    pub table: String,

    /// Entity type tag; descriptors without one are never stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    /// Prefix of this type's columns in flattened rows (`alias_column`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Columns, in declaration order
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,

    /// Foreign-key groups
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl EntityDescriptor {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            entity_type: None,
            alias: None,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Type tag, falling back to the table name for messages
    pub fn name(&self) -> &str {
        self.entity_type.as_deref().unwrap_or(&self.table)
    }

    /// Non-empty alias, if any
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref().filter(|a| !a.is_empty())
    }

    /// Find a column by storage name (case-insensitive)
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Columns that take part in row mapping
    pub fn mapped_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| !c.transient)
    }

    /// Primary-key columns in declaration order
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    /// Find the single column mapped to an attribute
    ///
    /// Fails when two columns claim the same attribute.
    pub fn column_for_attribute(&self, attribute: &str) -> Result<Option<&ColumnDescriptor>> {
        let mut found: Option<&ColumnDescriptor> = None;
        for col in self.mapped_columns() {
            if col.attribute().eq_ignore_ascii_case(attribute) {
                if found.is_some() {
                    return Err(Error::config(format!(
                        "Field '{}' of '{}' found duplicated columns definition",
                        attribute,
                        self.name()
                    )));
                }
                found = Some(col);
            }
        }
        Ok(found)
    }

    /// Check the descriptor is internally consistent
    pub fn validate(&self) -> Result<()> {
        let has_type = self.entity_type.as_deref().is_some_and(|t| !t.is_empty());
        if !has_type && self.alias().is_none() {
            return Err(Error::config(format!(
                "Descriptor of '{}' has neither entity type nor alias",
                self.table
            )));
        }

        let mut attributes = HashSet::new();
        for col in self.mapped_columns() {
            if !attributes.insert(col.attribute().to_ascii_lowercase()) {
                return Err(Error::config(format!(
                    "Field '{}' of '{}' found duplicated columns definition",
                    col.attribute(),
                    self.name()
                )));
            }
        }

        for fk in &self.foreign_keys {
            if fk.columns.is_empty() {
                return Err(Error::config(format!(
                    "Foreign key of '{}' to '{}' has no columns",
                    self.name(),
                    fk.parent_type
                )));
            }
            if !fk.parent_columns.is_empty() && fk.parent_columns.len() != fk.columns.len() {
                return Err(Error::config(format!(
                    "Foreign key of '{}' to '{}' has {} columns but {} parent columns",
                    self.name(),
                    fk.parent_type,
                    fk.columns.len(),
                    fk.parent_columns.len()
                )));
            }
            for col in &fk.columns {
                if self.column(col).is_none() {
                    return Err(Error::config(format!(
                        "Foreign key column '{}' is not a column of '{}'",
                        col,
                        self.name()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Does a flattened row label belong to `column` of the type aliased `alias`?
///
/// Labels look like `alias_column` and compare ASCII case-insensitively.
pub fn column_matches(label: &str, alias: &str, column: &str) -> bool {
    let split = alias.len();
    if label.len() != split + 1 + column.len() {
        return false;
    }
    match (label.get(..split), label.get(split..split + 1), label.get(split + 1..)) {
        (Some(prefix), Some("_"), Some(rest)) => {
            prefix.eq_ignore_ascii_case(alias) && rest.eq_ignore_ascii_case(column)
        }
        _ => false,
    }
}

/// Registered descriptors, keyed by entity type, in registration order
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    descriptors: Vec<EntityDescriptor>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a descriptor, replacing any earlier one of the same type
    ///
    /// Returns `false` when the descriptor is valid but carries no type tag and
    /// therefore is not stored.
    pub fn register(&mut self, descriptor: &EntityDescriptor) -> Result<bool> {
        descriptor.validate()?;
        let Some(entity_type) = descriptor.entity_type.as_deref().filter(|t| !t.is_empty()) else {
            tracing::warn!(
                "Descriptor of table '{}' has no entity type, ignoring it",
                descriptor.table
            );
            return Ok(false);
        };

        match self.index.get(entity_type) {
            Some(&pos) => self.descriptors[pos] = descriptor.clone(),
            None => {
                self.index
                    .insert(entity_type.to_string(), self.descriptors.len());
                self.descriptors.push(descriptor.clone());
            }
        }
        Ok(true)
    }

    /// Descriptor registered for an entity type
    pub fn get(&self, entity_type: &str) -> Option<&EntityDescriptor> {
        self.index.get(entity_type).map(|&pos| &self.descriptors[pos])
    }

    /// First descriptor whose table name matches (case-insensitive)
    pub fn by_table(&self, table: &str) -> Option<&EntityDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.table.eq_ignore_ascii_case(table))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn order_descriptor() -> EntityDescriptor {
        EntityDescriptor::new("orders")
            .with_entity_type("Order")
            .with_alias("o")
            .with_column(ColumnDescriptor::new("id").with_primary_key())
            .with_column(ColumnDescriptor::new("user_id").with_attribute("userId"))
            .with_foreign_key(ForeignKey::new(["user_id"], "User"))
    }

    #[test]
    fn test_column_matches() {
        assert!(column_matches("u_name", "u", "name"));
        assert!(column_matches("U_NAME", "u", "name"));
        assert!(column_matches("ord_userId", "ORD", "USERID"));
        assert!(!column_matches("u_name", "o", "name"));
        assert!(!column_matches("uname", "u", "name"));
        assert!(!column_matches("u_names", "u", "name"));
        assert!(!column_matches("u-name", "u", "name"));
        assert!(!column_matches("", "u", "name"));
    }

    #[test]
    fn test_column_matches_multibyte_label() {
        // Must not panic when the split falls inside a character
        assert!(!column_matches("é_name", "u", "name"));
        assert!(!column_matches("éname", "u", "name"));
        assert!(!column_matches("u_namé", "u", "name"));
    }

    #[test]
    fn test_attribute_defaults_to_column_name() {
        let col = ColumnDescriptor::new("name");
        assert_eq!(col.attribute(), "name");
        let col = ColumnDescriptor::new("user_id").with_attribute("userId");
        assert_eq!(col.attribute(), "userId");
    }

    #[test]
    fn test_validate_requires_type_or_alias() {
        let err = EntityDescriptor::new("users").validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(EntityDescriptor::new("users").with_alias("u").validate().is_ok());
        assert!(EntityDescriptor::new("users")
            .with_entity_type("User")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validate_duplicate_attribute() {
        let descriptor = EntityDescriptor::new("users")
            .with_entity_type("User")
            .with_column(ColumnDescriptor::new("name"))
            .with_column(ColumnDescriptor::new("user_name").with_attribute("Name"));
        let err = descriptor.validate().unwrap_err();
        assert!(err.to_string().contains("duplicated"));
        assert!(descriptor.column_for_attribute("name").is_err());

        // Transient columns do not take part in mapping
        let descriptor = EntityDescriptor::new("users")
            .with_entity_type("User")
            .with_column(ColumnDescriptor::new("name"))
            .with_column(ColumnDescriptor::new("user_name").with_attribute("name").with_transient());
        assert!(descriptor.validate().is_ok());
        assert_eq!(
            descriptor.column_for_attribute("name").unwrap().map(|c| c.name.as_str()),
            Some("name")
        );
    }

    #[test]
    fn test_validate_foreign_keys() {
        assert!(order_descriptor().validate().is_ok());

        let missing = order_descriptor().with_foreign_key(ForeignKey::new(["shop_id"], "Shop"));
        assert!(missing.validate().is_err());

        let empty = order_descriptor().with_foreign_key(ForeignKey::new(Vec::<String>::new(), "Shop"));
        assert!(empty.validate().is_err());

        let mismatched = order_descriptor().with_foreign_key(
            ForeignKey::new(["user_id"], "User").with_parent_columns(["id", "tenant"]),
        );
        assert!(mismatched.validate().is_err());
    }

    #[test]
    fn test_registry_register_and_replace() {
        let mut registry = SchemaRegistry::new();
        assert!(registry.register(&order_descriptor()).unwrap());
        assert_eq!(registry.len(), 1);

        let replaced = order_descriptor().with_alias("ord");
        assert!(registry.register(&replaced).unwrap());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Order").unwrap().alias(), Some("ord"));

        // Alias-only descriptors are accepted but not stored
        let alias_only = EntityDescriptor::new("tmp").with_alias("t");
        assert!(!registry.register(&alias_only).unwrap());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_by_table_first_match_wins() {
        let mut registry = SchemaRegistry::new();
        registry.register(&order_descriptor()).unwrap();
        registry
            .register(&EntityDescriptor::new("ORDERS").with_entity_type("ArchivedOrder"))
            .unwrap();

        let found = registry.by_table("Orders").unwrap();
        assert_eq!(found.entity_type.as_deref(), Some("Order"));
        assert!(registry.by_table("missing").is_none());
    }

    #[test]
    fn test_descriptor_from_toml() {
        let descriptor: EntityDescriptor = toml::from_str(
            r#"
            table = "orders"
            entity_type = "Order"
            alias = "o"

            [[columns]]
            name = "id"
            primary_key = true

            [[columns]]
            name = "userId"

            [[foreign_keys]]
            columns = ["userId"]
            parent_type = "User"
            "#,
        )
        .unwrap();

        assert_eq!(descriptor.columns.len(), 2);
        assert_eq!(descriptor.primary_key_columns().count(), 1);
        assert_eq!(descriptor.foreign_keys[0].parent_type, "User");
        assert!(descriptor.validate().is_ok());
    }
}
