//! Persistence layer: a SQLite/FTS5-backed [`ChunkStore`] for rows and
//! lexical search, and an in-process ANN [`VectorStore`] for semantic
//! search. Kept as two narrow, independently testable stores rather than
//! one combined repository — [`crate::index::IndexManager`] is the layer
//! that keeps them consistent with each other.

mod chunk_store;
mod vector_store;

pub use chunk_store::ChunkStore;
pub use vector_store::{VectorStore, VectorStoreError};
