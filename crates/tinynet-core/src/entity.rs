//! Entity accessor capability and the dynamic `Record` entity
//!
//! The net never looks inside an entity. It creates zero-value instances and
//! moves attribute values in and out through the [`Entity`] trait, so any
//! representation (plain structs, enums over several tables, dynamic maps)
//! can be stored as long as it implements the trait.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar value carried by rows and entity attributes
pub use serde_json::Value;

/// Attribute access for a materialized entity
pub trait Entity: Clone + fmt::Debug {
    /// Create a zero-value instance of an entity type
    fn instantiate(entity_type: &str) -> Result<Self>;

    /// Entity type tag of this instance
    fn entity_type(&self) -> &str;

    /// Read an attribute
    fn read(&self, attribute: &str) -> Result<Value>;

    /// Write an attribute
    fn write(&mut self, attribute: &str, value: Value) -> Result<()>;
}

/// Map-backed entity usable for any descriptor
///
/// Unset attributes read as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    entity_type: String,

    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set an attribute (builder style)
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(attribute.into(), value.into());
        self
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.fields.get(attribute)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }
}

impl Entity for Record {
    fn instantiate(entity_type: &str) -> Result<Self> {
        if entity_type.is_empty() {
            return Err(Error::accessor("", "", "Can not instantiate an untyped record"));
        }
        Ok(Self::new(entity_type))
    }

    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn read(&self, attribute: &str) -> Result<Value> {
        Ok(self.fields.get(attribute).cloned().unwrap_or(Value::Null))
    }

    fn write(&mut self, attribute: &str, value: Value) -> Result<()> {
        self.fields.insert(attribute.to_string(), value);
        Ok(())
    }
}
