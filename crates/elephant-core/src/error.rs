//! Error types for elephant.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::Relationship;

/// Result type alias using elephant's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for elephant operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A relationship already exists for the pair; carries the stored document
    #[error(
        "Relationship already exists between items {} and {}",
        .0.item_a,
        .0.item_b
    )]
    RelationshipExists(Box<Relationship>),

    /// File system operation on the data root failed
    #[error("Storage error during {op} on {}: {source}", .path.display())]
    Storage {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an I/O failure with the operation and path it happened on.
    pub fn storage(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Storage {
            op,
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
