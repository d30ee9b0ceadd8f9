//! Net definition file
//!
//! ```toml
//! [net]
//! cacheable = true
//!
//! [[entity]]
//! table = "users"
//! entity_type = "User"
//! alias = "u"
//! columns = [{ name = "id", primary_key = true }, { name = "name" }]
//!
//! [[query]]
//! name = "orders-of-a"
//!
//! [[query.step]]
//! mode = "S-"
//! entity = "User"
//! where = "name = 'a'"
//!
//! [[query.step]]
//! mode = "C+"
//! entity = "Order"
//! columns = ["userId"]
//! ```

use std::path::Path as FsPath;

use anyhow::{bail, Context};
use serde::Deserialize;
use tinynet_core::{EntityDescriptor, FirstN, NetConfig, Path, Target};

/// Parsed net definition
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetFile {
    #[serde(default)]
    pub net: NetConfig,

    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityDescriptor>,

    #[serde(default, rename = "query")]
    pub queries: Vec<QueryDef>,
}

impl NetFile {
    pub fn load(path: &FsPath) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read net definition {:?}", path))?;
        Self::parse(&raw).with_context(|| format!("Invalid net definition {:?}", path))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn query(&self, name: &str) -> Option<&QueryDef> {
        self.queries.iter().find(|q| q.name == name)
    }
}

/// Named path chain
#[derive(Debug, Clone, Deserialize)]
pub struct QueryDef {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, rename = "step")]
    pub steps: Vec<StepDef>,
}

impl QueryDef {
    pub fn to_path(&self) -> anyhow::Result<Path> {
        let mut steps = self.steps.iter();
        let Some(head) = steps.next() else {
            bail!("Query '{}' has no steps", self.name);
        };
        let mut path = head.to_path()?;
        for step in steps {
            path = path.then(step.to_path()?);
        }
        Ok(path)
    }
}

/// One step of a query
#[derive(Debug, Clone, Deserialize)]
pub struct StepDef {
    /// Two-symbol step kind, e.g. `S+` or `C-`
    pub mode: String,

    #[serde(default)]
    pub entity: Option<String>,

    #[serde(default)]
    pub table: Option<String>,

    #[serde(default)]
    pub columns: Vec<String>,

    #[serde(default, rename = "where")]
    pub filter: Option<String>,

    #[serde(default = "default_cacheable")]
    pub cacheable: bool,

    /// Keep at most this many nodes per step
    #[serde(default)]
    pub limit: Option<usize>,
}

fn default_cacheable() -> bool {
    true
}

impl StepDef {
    fn target(&self) -> anyhow::Result<Target> {
        match (&self.entity, &self.table) {
            (Some(entity), None) => Ok(Target::entity(entity.as_str())),
            (None, Some(table)) => Ok(Target::table(table.as_str())),
            (Some(_), Some(_)) => bail!("Step '{}' names both an entity and a table", self.mode),
            (None, None) => bail!("Step '{}' needs an entity or a table", self.mode),
        }
    }

    pub fn to_path(&self) -> anyhow::Result<Path> {
        let mut path = Path::new(self.mode.as_str(), self.target()?)
            .with_columns(&self.columns)
            .with_cacheable(self.cacheable);
        if let Some(filter) = &self.filter {
            path = path.with_filter(filter.as_str());
        }
        if let Some(limit) = self.limit {
            path = path.with_checker(FirstN(limit));
        }
        Ok(path)
    }
}
