//! Candidate validation for path steps
//!
//! A candidate node is selected only when both the structural check and the
//! expression check pass. Paths may carry their own validator; all other
//! steps use [`DefaultValidator`].

use crate::entity::Entity;
use crate::error::Result;
use crate::expression::Expr;
use crate::node::Node;
use crate::store::NodeStore;

/// Pluggable predicate consulted for every candidate of a step
pub trait Validator<E: Entity> {
    /// Structural check; `selected` is how many nodes this step already kept
    fn accept(&self, _store: &NodeStore<E>, _node: &Node<E>, _level: usize, _selected: usize) -> bool {
        true
    }

    /// Expression check against the candidate's entity
    fn matches(&self, entity: &E, filter: Option<&Expr>, _selected: usize) -> Result<bool> {
        match filter {
            Some(expr) => expr.evaluate(entity),
            None => Ok(true),
        }
    }

    /// Stable key describing this validator's behaviour
    ///
    /// Steps whose validator returns `None` are never cached.
    fn cache_key(&self) -> Option<String> {
        None
    }
}

/// Accepts every node and evaluates the step's where-expression
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValidator;

impl<E: Entity> Validator<E> for DefaultValidator {
    fn cache_key(&self) -> Option<String> {
        Some("default".to_string())
    }
}

/// Keeps at most `n` nodes per step, counted across all input nodes of a child step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirstN(pub usize);

impl<E: Entity> Validator<E> for FirstN {
    fn accept(&self, _store: &NodeStore<E>, _node: &Node<E>, _level: usize, selected: usize) -> bool {
        selected < self.0
    }

    fn cache_key(&self) -> Option<String> {
        Some(format!("first:{}", self.0))
    }
}
