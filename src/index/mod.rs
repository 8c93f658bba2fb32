//! [`IndexManager`]: the transactional-ish façade over [`ChunkStore`] and
//! [`VectorStore`] that [`crate::search::HybridSearch`] reads through.
//! Owns both stores exclusively; nothing else is allowed to mutate them.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::domain::types::{Chunk, ConsistencyReport, IndexStatistics, ReindexResult};
use crate::domain::Result;
use crate::store::{ChunkStore, VectorStore};

pub struct IndexManager {
    chunk_store: ChunkStore,
    vector_store: VectorStore,
}

impl IndexManager {
    pub fn new(chunk_store: ChunkStore, vector_store: VectorStore) -> Self {
        Self { chunk_store, vector_store }
    }

    pub fn chunk_store(&self) -> &ChunkStore {
        &self.chunk_store
    }

    pub fn vector_store(&self) -> &VectorStore {
        &self.vector_store
    }

    /// Insert one chunk and its vector. If the vector insert fails, the
    /// chunk row is kept (per spec) — callers repair divergence with
    /// [`IndexManager::verify_consistency`] rather than relying on this
    /// call to roll itself back.
    pub async fn index(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        self.chunk_store.upsert_chunk(&chunk).await?;
        self.vector_store.add(&chunk.id, &vector)?;
        Ok(())
    }

    pub async fn index_batch(&mut self, items: Vec<(Chunk, Vec<f32>)>) -> Result<()> {
        let chunks: Vec<Chunk> = items.iter().map(|(c, _)| c.clone()).collect();
        self.chunk_store.upsert_chunks(&chunks).await?;
        for (chunk, vector) in &items {
            self.vector_store.add(&chunk.id, vector)?;
        }
        Ok(())
    }

    /// Whether `file_hash` has never been recorded by [`Self::record_indexed`]
    /// for any path — a pure content check, not a per-path one, so content
    /// that reappears under a new path is recognized as already handled.
    pub async fn needs_indexing(&self, file_hash: &str) -> Result<bool> {
        Ok(!self.chunk_store.has_file_hash(file_hash).await?)
    }

    pub async fn record_indexed(&mut self, file_hash: &str, path: &str) -> Result<()> {
        self.chunk_store.record_file_hash(path, file_hash).await
    }

    /// Atomically replace every chunk (and its vector) at `path` with
    /// `new_chunks`. `new_chunks` are inserted with no vectors — this
    /// operation alone never embeds; pair it with `index_batch` or use
    /// [`Self::reindex_with_change_detection`] for embedding-aware reindex.
    pub async fn reindex(&mut self, path: &str, new_chunks: Vec<Chunk>) -> Result<()> {
        let old_ids = self.chunk_store.delete_chunks_for_path(path).await?;
        for id in &old_ids {
            self.vector_store.remove(id)?;
        }
        self.chunk_store.upsert_chunks(&new_chunks).await?;
        Ok(())
    }

    /// Reindex `path`, reusing embeddings for any new chunk whose
    /// `content_hash` matches a chunk already in the store (anywhere, not
    /// just at `path`) and embedding only the remainder via `embed_fn`,
    /// called at most once.
    pub async fn reindex_with_change_detection<F, Fut>(
        &mut self,
        path: &str,
        new_chunks: Vec<Chunk>,
        embed_fn: F,
    ) -> Result<ReindexResult>
    where
        F: FnOnce(Vec<Chunk>) -> Fut,
        Fut: Future<Output = Result<Vec<Vec<f32>>>>,
    {
        let total = new_chunks.len();

        // Resolve reuse candidates against the store as it stands *before*
        // deleting this path's old rows, so unchanged-content-moved-line and
        // unchanged-content-same-line cases both find their old vector.
        let mut reuse: Vec<(String, Vec<f32>)> = Vec::new();
        let mut to_embed: Vec<Chunk> = Vec::new();
        for chunk in &new_chunks {
            let existing_id = self.chunk_store.find_id_by_content_hash(&chunk.content_hash).await?;
            let vector = existing_id.and_then(|id| self.vector_store.get(&id).cloned());
            match vector {
                Some(vector) => reuse.push((chunk.id.clone(), vector)),
                None => to_embed.push(chunk.clone()),
            }
        }

        // Embed the remainder *before* touching the store: if `embed_fn`
        // fails, the path's prior rows must still be exactly as they were
        // (the all-or-nothing invariant), so no destructive mutation can
        // happen until embedding has already succeeded.
        let embedded_count = to_embed.len();
        let embedded_vectors = if to_embed.is_empty() {
            Vec::new()
        } else {
            embed_fn(to_embed.clone()).await?
        };
        if embedded_vectors.len() != to_embed.len() {
            return Err(crate::domain::Error::internal(format!(
                "embed_fn returned {} vectors for {} chunks",
                embedded_vectors.len(),
                to_embed.len()
            )));
        }

        let old_ids = self.chunk_store.delete_chunks_for_path(path).await?;
        for id in &old_ids {
            self.vector_store.remove(id)?;
        }

        self.chunk_store.upsert_chunks(&new_chunks).await?;
        for (chunk_id, vector) in &reuse {
            self.vector_store.add(chunk_id, vector)?;
        }
        for (chunk, vector) in to_embed.iter().zip(embedded_vectors) {
            self.vector_store.add(&chunk.id, &vector)?;
        }

        Ok(ReindexResult {
            total,
            reused: reuse.len(),
            embedded: embedded_count,
        })
    }

    pub async fn statistics(&self) -> Result<IndexStatistics> {
        let chunk_count = self.chunk_store.chunk_count().await?;
        let vector_count = self.vector_store.len();
        let file_count = self.chunk_store.file_count().await?;
        Ok(IndexStatistics {
            chunk_count,
            vector_count,
            file_count,
            dimension: self.vector_store.dimension(),
            is_consistent: chunk_count == vector_count,
        })
    }

    pub async fn verify_consistency(&self) -> Result<ConsistencyReport> {
        let chunk_ids: std::collections::HashSet<String> =
            self.chunk_store.all_chunk_ids().await?.into_iter().collect();
        let vector_ids: std::collections::HashSet<String> =
            self.vector_store.ids().cloned().collect();

        let missing_vectors: Vec<String> = chunk_ids.difference(&vector_ids).cloned().collect();
        let orphaned_vectors: Vec<String> = vector_ids.difference(&chunk_ids).cloned().collect();
        Ok(ConsistencyReport { missing_vectors, orphaned_vectors })
    }

    pub async fn clear(&mut self) -> Result<()> {
        self.chunk_store.clear().await?;
        self.vector_store.clear();
        Ok(())
    }

    /// Persist the vector store to `vectors.bin` under `data_dir`. The
    /// chunk store is already durable (it's a SQLite file); only the
    /// in-process ANN index needs an explicit save.
    pub fn save_vectors(&self, data_dir: &Path) -> Result<()> {
        self.vector_store
            .save(&vectors_path(data_dir))
            .map_err(|e| crate::domain::Error::internal(e.to_string()))
    }
}

pub fn vectors_path(data_dir: &Path) -> PathBuf {
    data_dir.join("vectors.bin")
}

pub fn chunks_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("chunks.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ChunkKind;

    async fn manager(dimension: usize) -> IndexManager {
        IndexManager::new(ChunkStore::open_in_memory().await.unwrap(), VectorStore::new(dimension))
    }

    fn chunk(path: &str, line: u32, content: &str) -> Chunk {
        Chunk::new(path.to_string(), line, line, ChunkKind::Function, content.to_string(), "rust".to_string())
    }

    #[tokio::test]
    async fn needs_indexing_is_false_after_record_indexed() {
        let mut mgr = manager(4).await;
        assert!(mgr.needs_indexing("abc").await.unwrap());
        mgr.record_indexed("abc", "a.rs").await.unwrap();
        assert!(!mgr.needs_indexing("abc").await.unwrap());
    }

    #[tokio::test]
    async fn reindex_replaces_all_chunks_for_a_path() {
        let mut mgr = manager(2).await;
        let c1 = chunk("a.rs", 1, "fn a() {}");
        mgr.index(c1.clone(), vec![1.0, 0.0]).await.unwrap();
        let c2 = chunk("a.rs", 5, "fn b() {}");
        mgr.reindex("a.rs", vec![c2.clone()]).await.unwrap();

        assert!(mgr.chunk_store.get_chunk(&c1.id).await.unwrap().is_none());
        assert!(mgr.chunk_store.get_chunk(&c2.id).await.unwrap().is_some());
        // reindex() alone never embeds, so the new chunk has no vector yet.
        assert!(!mgr.vector_store.contains(&c2.id));
    }

    #[tokio::test]
    async fn reindex_with_change_detection_reuses_unchanged_content() {
        let mut mgr = manager(2).await;
        let unchanged = chunk("a.rs", 1, "fn unchanged() {}");
        let changed_old = chunk("a.rs", 10, "fn old() {}");
        mgr.index(unchanged.clone(), vec![1.0, 1.0]).await.unwrap();
        mgr.index(changed_old.clone(), vec![2.0, 2.0]).await.unwrap();

        let changed_new = chunk("a.rs", 10, "fn new() {}");
        let new_chunks = vec![unchanged.clone(), changed_new.clone()];

        let result = mgr
            .reindex_with_change_detection("a.rs", new_chunks, |to_embed| async move {
                Ok(to_embed.iter().map(|_| vec![9.0, 9.0]).collect())
            })
            .await
            .unwrap();

        assert_eq!(result.total, 2);
        assert_eq!(result.reused, 1);
        assert_eq!(result.embedded, 1);
        assert_eq!(mgr.vector_store.get(&unchanged.id).cloned(), Some(vec![1.0, 1.0]));
        assert_eq!(mgr.vector_store.get(&changed_new.id).cloned(), Some(vec![9.0, 9.0]));
    }

    #[tokio::test]
    async fn reindex_with_change_detection_preserves_prior_state_on_embed_failure() {
        let mut mgr = manager(2).await;
        let original = chunk("a.rs", 1, "fn original() {}");
        mgr.index(original.clone(), vec![1.0, 1.0]).await.unwrap();

        let replacement = chunk("a.rs", 1, "fn replacement() {}");
        let result = mgr
            .reindex_with_change_detection("a.rs", vec![replacement.clone()], |_to_embed| async move {
                Err(crate::domain::Error::internal("embedding backend unavailable"))
            })
            .await;

        assert!(result.is_err());
        assert!(mgr.chunk_store.get_chunk(&original.id).await.unwrap().is_some());
        assert!(mgr.vector_store.contains(&original.id));
        assert!(mgr.chunk_store.get_chunk(&replacement.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn verify_consistency_reports_missing_vectors() {
        let mut mgr = manager(2).await;
        let c = chunk("a.rs", 1, "fn a() {}");
        mgr.chunk_store.upsert_chunk(&c).await.unwrap();
        let report = mgr.verify_consistency().await.unwrap();
        assert_eq!(report.missing_vectors, vec![c.id]);
        assert!(report.orphaned_vectors.is_empty());
        assert!(!report.is_consistent());
    }
}
