//! Error types for the table store.
//!
//! Every condition here is local, synchronous and non-retryable: it is
//! reported at the offending call and never triggers an implicit retry or
//! rollback.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Index out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid column name: {0}")]
    InvalidName(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Unsupported column type: {0}")]
    UnsupportedColumnType(String),

    #[error("Row is no longer attached to its table")]
    StaleRow,

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Write transaction slot is already held")]
    WouldBlock,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
