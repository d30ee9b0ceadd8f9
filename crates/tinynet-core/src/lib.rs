//! TinyNet Core - in-memory entity graph built from flat rows
//!
//! Rows produced by joins are split into typed entities using registered
//! descriptors, merged into nodes by primary key, and linked to their
//! parents through foreign keys. Path chains then select nodes by walking
//! those links, with results memoized until the next write.

pub mod cache;
pub mod entity;
pub mod error;
pub mod expression;
pub mod ingest;
pub mod limits;
pub mod net;
pub mod node;
pub mod path;
pub mod relation;
pub mod schema;
pub mod store;
pub mod traversal;
pub mod validator;

pub use cache::TraversalCache;
pub use entity::{Entity, Record, Value};
pub use error::{Error, ErrorKind, Result};
pub use expression::{CompareOp, Expr};
pub use ingest::{IngestStats, MergeOutcome, Row};
pub use net::{NetConfig, TinyNet};
pub use node::{Node, NodeKey, NodeSet, COMPOUND_VALUE_SEPARATOR};
pub use path::{Mode, Path, StepKind, Target};
pub use relation::ParentRelation;
pub use schema::{ColumnDescriptor, EntityDescriptor, ForeignKey, SchemaRegistry};
pub use store::NodeStore;
pub use traversal::{PathResult, TraversalEngine, TraversalStats};
pub use validator::{DefaultValidator, FirstN, Validator};
