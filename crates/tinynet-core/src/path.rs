//! Path steps: the declarative traversal language
//!
//! A path is a chain of steps. Each step names a target entity type (or
//! table) and a two-symbol kind:
//!
//! - symbol 1: `S` selects from the whole store (chain head only), `C`
//!   selects children of the previous step's nodes through `columns`
//! - symbol 2: `+` adds the step's nodes to the result, anything else only
//!   feeds the next step
//!
//! ```
//! use tinynet_core::Path;
//!
//! // Orders of users named 'a', keeping only the orders
//! let path: Path = Path::new("S-", "User")
//!     .with_filter("name = 'a'")
//!     .then(Path::new("C+", "Order").with_columns(["userId"]));
//! assert_eq!(path.len(), 2);
//! ```

use crate::entity::{Entity, Record};
use crate::error::{Error, Result};
use crate::relation::column_set;
use crate::validator::Validator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// What a step selects
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Entity type tag
    Entity(String),
    /// Table name, matched case-insensitively
    Table(String),
}

impl Target {
    pub fn entity(name: impl Into<String>) -> Self {
        Self::Entity(name.into())
    }

    pub fn table(name: impl Into<String>) -> Self {
        Self::Table(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Entity(s) | Self::Table(s) => s,
        }
    }
}

impl From<&str> for Target {
    fn from(s: &str) -> Self {
        Self::Entity(s.to_string())
    }
}

impl From<String> for Target {
    fn from(s: String) -> Self {
        Self::Entity(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(s) => write!(f, "{}", s),
            Self::Table(s) => write!(f, "table:{}", s),
        }
    }
}

/// Traversal mode, symbol 1 of a step kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `S`: every node of the target type
    Select,
    /// `C`: children of the input nodes
    Children,
}

/// Decoded two-symbol step kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepKind {
    pub mode: Mode,
    pub accumulate: bool,
}

impl StepKind {
    pub fn parse(code: &str) -> Result<Self> {
        let mut chars = code.chars();
        let (Some(mode), Some(symbol), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(Error::query(format!(
                "Path type '{}' must have exactly two symbols",
                code
            )));
        };
        let mode = match mode.to_ascii_uppercase() {
            'S' => Mode::Select,
            'C' => Mode::Children,
            other => {
                return Err(Error::query(format!(
                    "Unknown traversal mode '{}' in path type '{}'",
                    other, code
                )))
            }
        };
        Ok(Self {
            mode,
            accumulate: symbol == '+',
        })
    }
}

/// One traversal step plus the rest of its chain
pub struct Path<E: Entity = Record> {
    kind: String,
    target: Target,
    columns: BTreeSet<String>,
    filter: Option<String>,
    checker: Option<Rc<dyn Validator<E>>>,
    cacheable: bool,
    next: Option<Box<Path<E>>>,
}

impl<E: Entity> Path<E> {
    /// Create a cacheable step with no columns, filter or checker
    pub fn new(kind: impl Into<String>, target: impl Into<Target>) -> Self {
        Self {
            kind: kind.into(),
            target: target.into(),
            columns: BTreeSet::new(),
            filter: None,
            checker: None,
            cacheable: true,
            next: None,
        }
    }

    /// Foreign-key columns to follow in child mode
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.columns = column_set(columns);
        self
    }

    /// Where-expression candidates must satisfy
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Validator replacing the default for this step only
    pub fn with_checker(mut self, checker: impl Validator<E> + 'static) -> Self {
        self.checker = Some(Rc::new(checker));
        self
    }

    pub fn with_cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }

    /// Append a step (or chain) at the end of this chain
    pub fn then(mut self, next: Path<E>) -> Self {
        self.append(next);
        self
    }

    fn append(&mut self, next: Path<E>) {
        if let Some(tail) = self.next.as_mut() {
            tail.append(next);
        } else {
            self.next = Some(Box::new(next));
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn step_kind(&self) -> Result<StepKind> {
        StepKind::parse(&self.kind)
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn columns(&self) -> &BTreeSet<String> {
        &self.columns
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn checker(&self) -> Option<&dyn Validator<E>> {
        self.checker.as_deref()
    }

    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    pub fn next(&self) -> Option<&Path<E>> {
        self.next.as_deref()
    }

    /// Number of steps in the chain starting here
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut step = Some(self);
        while let Some(path) = step {
            count += 1;
            step = path.next();
        }
        count
    }

    /// Cache key component derived from this step's own fields
    ///
    /// Empty when the step's checker offers no cache key.
    pub fn unique_id(&self) -> String {
        let checker_key = match &self.checker {
            Some(checker) => match checker.cache_key() {
                Some(key) => key,
                None => return String::new(),
            },
            None => String::new(),
        };
        let columns: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        format!(
            "{}|{}|{}|{}|{}",
            self.kind.to_ascii_uppercase(),
            self.target,
            columns.join(","),
            self.filter.as_deref().unwrap_or(""),
            checker_key
        )
    }
}

impl<E: Entity> Clone for Path<E> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            target: self.target.clone(),
            columns: self.columns.clone(),
            filter: self.filter.clone(),
            checker: self.checker.clone(),
            cacheable: self.cacheable,
            next: self.next.clone(),
        }
    }
}

impl<E: Entity> fmt::Debug for Path<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Path")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("columns", &self.columns)
            .field("filter", &self.filter)
            .field("checker", &self.checker.is_some())
            .field("cacheable", &self.cacheable)
            .field("next", &self.next)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::FirstN;

    struct Opaque;
    impl Validator<Record> for Opaque {}

    #[test]
    fn test_step_kind_parse() {
        assert_eq!(
            StepKind::parse("S+").unwrap(),
            StepKind {
                mode: Mode::Select,
                accumulate: true
            }
        );
        assert_eq!(
            StepKind::parse("c-").unwrap(),
            StepKind {
                mode: Mode::Children,
                accumulate: false
            }
        );
        assert!(StepKind::parse("S").is_err());
        assert!(StepKind::parse("S++").is_err());
        assert!(StepKind::parse("X+").is_err());
        assert!(StepKind::parse("").is_err());
    }

    #[test]
    fn test_then_appends_at_tail() {
        let path: Path = Path::new("S-", "User")
            .then(Path::new("C-", "Order").with_columns(["userId"]))
            .then(Path::new("C+", "Item").with_columns(["orderId"]));

        assert_eq!(path.len(), 3);
        let last = path.next().and_then(Path::next).unwrap();
        assert_eq!(last.target(), &Target::entity("Item"));
        assert!(last.next().is_none());
    }

    #[test]
    fn test_unique_id_is_deterministic() {
        let a: Path = Path::new("c+", "Order").with_columns(["userId"]).with_filter("id > 1");
        let b: Path = Path::new("C+", "Order").with_columns(["USERID"]).with_filter("id > 1");
        let c: Path = Path::new("C+", "Order").with_columns(["userId"]);

        assert_eq!(a.unique_id(), b.unique_id());
        assert_ne!(a.unique_id(), c.unique_id());
        assert_ne!(
            Path::<Record>::new("S+", Target::table("orders")).unique_id(),
            Path::<Record>::new("S+", "orders").unique_id()
        );
    }

    #[test]
    fn test_unique_id_depends_on_checker() {
        let plain: Path = Path::new("S+", "User");
        let capped: Path = Path::new("S+", "User").with_checker(FirstN(1));
        let opaque: Path = Path::new("S+", "User").with_checker(Opaque);

        assert_ne!(plain.unique_id(), capped.unique_id());
        assert!(capped.unique_id().ends_with("first:1"));
        assert!(opaque.unique_id().is_empty());
    }

    #[test]
    fn test_clone_keeps_chain() {
        let path: Path = Path::new("S-", "User").then(Path::new("C+", "Order"));
        let copy = path.clone();
        assert_eq!(copy.len(), 2);
        assert_eq!(copy.unique_id(), path.unique_id());
    }
}
