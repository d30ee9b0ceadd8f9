//! Error types for TinyNet Core

use thiserror::Error;

/// Result type alias using TinyNet's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Broad error category, independent of the message text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Descriptor metadata is missing or inconsistent
    Config,
    /// A path could not be evaluated
    Query,
    /// Reading or writing an entity attribute failed
    Accessor,
}

/// TinyNet error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Accessor error on {entity_type}.{attribute}: {message}")]
    Accessor {
        entity_type: String,
        attribute: String,
        message: String,
    },

    #[error("Expression error at offset {position}: {message}")]
    Expression { message: String, position: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    pub fn accessor(
        entity_type: impl Into<String>,
        attribute: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Accessor {
            entity_type: entity_type.into(),
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    pub fn expression(message: impl Into<String>, position: usize) -> Self {
        Self::Expression {
            message: message.into(),
            position,
        }
    }

    /// Taxonomy of this error; malformed expressions count as query errors
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Serialization(_) => ErrorKind::Config,
            Self::Query(_) | Self::Expression { .. } => ErrorKind::Query,
            Self::Accessor { .. } => ErrorKind::Accessor,
        }
    }
}
