//! Error taxonomies for the code-intelligence core.
//!
//! Each component owns its own `thiserror` enum (spec.md §7); this module
//! only aggregates them into the top-level [`Error`]/[`Result`] that crosses
//! module boundaries, the way the teacher's `domain::error::Error` aggregates
//! `std::io::Error`/`serde_json::Error` via `#[from]`.

use thiserror::Error;

use crate::chunking::ParseError;
use crate::embedding::{BatcherError, ProviderError};
use crate::store::VectorStoreError;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the code-intelligence core.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Batcher(#[from] BatcherError),

    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),

    #[error("row store error: {0}")]
    Store(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found<S: Into<String>>(s: S) -> Self {
        Self::NotFound(s.into())
    }

    pub fn invalid_argument<S: Into<String>>(s: S) -> Self {
        Self::InvalidArgument(s.into())
    }

    pub fn internal<S: Into<String>>(s: S) -> Self {
        Self::Internal(s.into())
    }

    pub fn store<S: Into<String>>(s: S) -> Self {
        Self::Store(s.into())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}
