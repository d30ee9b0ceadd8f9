//! Guards against runaway traversal

use crate::error::{Error, Result};

/// Deepest chain level a path may reach before evaluation gives up (1000)
pub const MAX_PATH_LEVEL: usize = 1000;

/// Largest node set an uncacheable step may select (100,000)
pub const MAX_UNCACHED_RESULT: usize = 100_000;

/// Deepest nesting of parentheses and `not` in a where-expression (128)
pub const MAX_EXPRESSION_DEPTH: usize = 128;

/// Cache bucket used by steps that select from the whole store
pub const ROOT_ORIGIN: &str = "ROOT";

/// Validate the chain level of a step about to be evaluated
pub fn validate_path_level(level: usize, max: usize) -> Result<()> {
    if level > max {
        return Err(Error::query(format!(
            "Search level {} beyond {}, this is likely a cyclic path chain",
            level, max
        )));
    }
    Ok(())
}

/// Validate the size of a step's selection
pub fn validate_selected_size(target: &str, count: usize, max: usize) -> Result<()> {
    if count > max {
        return Err(Error::query(format!(
            "Path step on '{}' selected {} nodes (max {}), the path is probably missing a constraint",
            target, count, max
        )));
    }
    Ok(())
}
