//! Storage error model.

use thiserror::Error;

/// Result type used across the record lifecycle and every storage backend.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-level error.
///
/// The four categories are the only failures the lifecycle or an engine may
/// surface. None of them is retried internally; retry policy belongs to the
/// caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Serialized input could not be turned back into a record (missing or
    /// malformed timestamps, missing or unknown kind marker, mistyped field).
    #[error("format error: {0}")]
    Format(String),

    /// The engine's connection/session is not open, or could not be acquired.
    #[error("resource error: {0}")]
    Resource(String),

    /// An identity is already known to the engine under a different kind.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Pending changes could not be committed; nothing was applied.
    #[error("durability error: {0}")]
    Durability(String),
}

impl StoreError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn durability(msg: impl Into<String>) -> Self {
        Self::Durability(msg.into())
    }

    /// Error returned by engine operations invoked outside the Open state.
    pub fn not_open(operation: &str) -> Self {
        Self::Resource(format!("{operation}: storage engine is not open (call reload first)"))
    }
}
