//! Where-expressions: a small filter language over entity attributes
//!
//! ```text
//! age >= 18 and (name like 'A%' or email is not null)
//! status not in ('closed', 'void')
//! ```
//!
//! Attribute names are read through the [`Entity`] accessor, so a failing read
//! surfaces as an accessor error rather than a silent mismatch.

mod lexer;
mod parser;

pub use lexer::{tokenize, SpannedToken, Token};
pub use parser::parse;

use crate::entity::{Entity, Value};
use crate::error::Result;
use std::cmp::Ordering;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Parsed where-expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare {
        attribute: String,
        op: CompareOp,
        value: Value,
    },
    IsNull {
        attribute: String,
        negated: bool,
    },
    In {
        attribute: String,
        values: Vec<Value>,
        negated: bool,
    },
    Like {
        attribute: String,
        pattern: String,
        negated: bool,
    },
}

impl Expr {
    /// Parse a where-expression
    pub fn parse(source: &str) -> Result<Self> {
        parse(source)
    }

    /// Evaluate against an entity
    pub fn evaluate<E: Entity>(&self, entity: &E) -> Result<bool> {
        match self {
            Expr::And(left, right) => Ok(left.evaluate(entity)? && right.evaluate(entity)?),
            Expr::Or(left, right) => Ok(left.evaluate(entity)? || right.evaluate(entity)?),
            Expr::Not(inner) => Ok(!inner.evaluate(entity)?),
            Expr::Compare {
                attribute,
                op,
                value,
            } => {
                let actual = entity.read(attribute)?;
                Ok(compare(&actual, *op, value))
            }
            Expr::IsNull { attribute, negated } => {
                let actual = entity.read(attribute)?;
                Ok(actual.is_null() != *negated)
            }
            Expr::In {
                attribute,
                values,
                negated,
            } => {
                let actual = entity.read(attribute)?;
                let found = !actual.is_null() && values.iter().any(|v| values_equal(&actual, v));
                Ok(found != *negated)
            }
            Expr::Like {
                attribute,
                pattern,
                negated,
            } => {
                let actual = entity.read(attribute)?;
                let text = match &actual {
                    Value::Null => return Ok(false),
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Ok(like_match(&text, pattern) != *negated)
            }
        }
    }
}

/// Order two scalars of compatible kinds
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        _ => compare_values(a, b) == Some(Ordering::Equal),
    }
}

fn compare(actual: &Value, op: CompareOp, expected: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(actual, expected),
        CompareOp::Ne => !values_equal(actual, expected),
        CompareOp::Lt => compare_values(actual, expected).is_some_and(Ordering::is_lt),
        CompareOp::Le => compare_values(actual, expected).is_some_and(Ordering::is_le),
        CompareOp::Gt => compare_values(actual, expected).is_some_and(Ordering::is_gt),
        CompareOp::Ge => compare_values(actual, expected).is_some_and(Ordering::is_ge),
    }
}

/// SQL `LIKE` matching: `%` is any run of characters, `_` exactly one
pub fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '%')
}
