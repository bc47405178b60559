//! Error types surfaced by the Tempus crates.
//!
//! Semantic and plan errors are raised while a plan is being constructed
//! whenever the statement's structure decides them; only the
//! data-dependent aggregation checks surface semantically during
//! execution. Storage errors propagate verbatim from the backend.
//! Cancellation is its own kind so callers can tell an aborted query
//! apart from a failed one.

use thiserror::Error;

/// Result alias used throughout Tempus.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error kind.
#[derive(Error, Debug)]
pub enum Error {
    /// Textual form of a value could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The statement violates a semantic invariant (unbound projection,
    /// ungrouped column, malformed temporal window, ...).
    #[error("semantic error: {0}")]
    Semantic(String),

    /// Error reported by a storage backend.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A plan could not be constructed for the statement.
    #[error("plan error: {0}")]
    Plan(String),

    /// Runtime failure during lookup or join evaluation.
    #[error("execution error: {0}")]
    Exec(String),

    /// The operation was canceled through its [`Context`].
    ///
    /// [`Context`]: crate::utils::context::Context
    #[error("operation canceled")]
    Canceled,
}

/// Errors produced by storage backends.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The addressed graph does not exist in the store.
    #[error("graph {0:?} not found")]
    GraphNotFound(String),

    /// A graph with the same identifier already exists.
    #[error("graph {0:?} already exists")]
    GraphAlreadyExists(String),

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Returns true if this error is a cancellation.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }
}
