//! ANN vector store backed by `edgevec`, with a JSON side-car persisting the
//! id map so chunk ids (SHA-256 hex strings) can key into an index that
//! only understands integer handles.
//!
//! `edgevec` does not expose its own durable serialization format in the
//! version this workspace depends on, so persistence here re-inserts every
//! vector into a fresh in-memory index on load rather than round-tripping
//! `edgevec`'s internal bytes — slower to load, but decoupled from an
//! internal format we don't control.

use std::collections::HashMap;
use std::path::Path;

use edgevec::{DistanceMetric, Index};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the vector store.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vector store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ann index error: {0}")]
    Index(String),
}

#[derive(Serialize, Deserialize)]
struct PersistedVectors {
    dimension: usize,
    entries: Vec<(String, Vec<f32>)>,
}

/// In-process ANN index keyed by chunk id.
pub struct VectorStore {
    index: Index,
    dimension: usize,
    id_to_handle: HashMap<String, u64>,
    handle_to_id: HashMap<u64, String>,
    vectors: HashMap<String, Vec<f32>>,
    next_handle: u64,
}

impl VectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            index: Index::new(dimension, DistanceMetric::Cosine),
            dimension,
            id_to_handle: HashMap::new(),
            handle_to_id: HashMap::new(),
            vectors: HashMap::new(),
            next_handle: 0,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_to_handle.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Vec<f32>> {
        self.vectors.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.vectors.keys()
    }

    /// Insert or replace the vector for `id`.
    pub fn add(&mut self, id: &str, vector: &[f32]) -> Result<(), VectorStoreError> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if let Some(&handle) = self.id_to_handle.get(id) {
            self.index.remove(handle).map_err(|e| VectorStoreError::Index(e.to_string()))?;
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.index
            .insert(handle, vector)
            .map_err(|e| VectorStoreError::Index(e.to_string()))?;
        self.id_to_handle.insert(id.to_string(), handle);
        self.handle_to_id.insert(handle, id.to_string());
        self.vectors.insert(id.to_string(), vector.to_vec());
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<bool, VectorStoreError> {
        let Some(handle) = self.id_to_handle.remove(id) else {
            return Ok(false);
        };
        self.handle_to_id.remove(&handle);
        self.vectors.remove(id);
        self.index.remove(handle).map_err(|e| VectorStoreError::Index(e.to_string()))?;
        Ok(true)
    }

    /// Approximate nearest neighbors to `query`, as `(chunk_id, similarity)`
    /// pairs sorted by descending similarity.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(String, f32)>, VectorStoreError> {
        if query.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.vectors.is_empty() {
            return Ok(Vec::new());
        }
        let hits = self
            .index
            .search(query, k)
            .map_err(|e| VectorStoreError::Index(e.to_string()))?;
        Ok(hits
            .into_iter()
            .filter_map(|(handle, score)| self.handle_to_id.get(&handle).map(|id| (id.clone(), score)))
            .collect())
    }

    pub fn save(&self, path: &Path) -> Result<(), VectorStoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let entries = self.vectors.iter().map(|(id, v)| (id.clone(), v.clone())).collect();
        let persisted = PersistedVectors {
            dimension: self.dimension,
            entries,
        };
        let bytes = serde_json::to_vec(&persisted)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, VectorStoreError> {
        let bytes = std::fs::read(path)?;
        let persisted: PersistedVectors = serde_json::from_slice(&bytes)?;
        let mut store = Self::new(persisted.dimension);
        for (id, vector) in persisted.entries {
            store.add(&id, &vector)?;
        }
        Ok(store)
    }

    pub fn load_or_new(path: &Path, dimension: usize) -> Result<Self, VectorStoreError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new(dimension))
        }
    }

    pub fn clear(&mut self) {
        self.index = Index::new(self.dimension, DistanceMetric::Cosine);
        self.id_to_handle.clear();
        self.handle_to_id.clear();
        self.vectors.clear();
        self.next_handle = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_search_round_trips() {
        let mut store = VectorStore::new(3);
        store.add("a", &[1.0, 0.0, 0.0]).unwrap();
        store.add("b", &[0.0, 1.0, 0.0]).unwrap();
        let hits = store.search(&[1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].0, "a");
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut store = VectorStore::new(3);
        assert!(matches!(
            store.add("a", &[1.0, 0.0]),
            Err(VectorStoreError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        let mut store = VectorStore::new(2);
        store.add("x", &[0.5, 0.5]).unwrap();
        store.save(&path).unwrap();
        let loaded = VectorStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains("x"));
    }
}
