//! CLI command implementations

pub mod completions;
pub mod nodes;
pub mod query;
pub mod stats;
