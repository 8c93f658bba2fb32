//! Hybrid (BM25 + semantic) code search: lexical and vector lanes fused by
//! Reciprocal Rank Fusion, re-ranked by CamelCase-aware exact-match
//! boosting, optionally widened by a reference-following multi-hop pass,
//! and optionally merged with a remote overlay index.
//!
//! Grounded on the fusion pipeline shape of a context-finder-mcp-style
//! `HybridSearch` (semantic lane, fuzzy/lexical lane, RRF fuse, AST-aware
//! boost, sort+truncate) adapted onto this crate's [`ChunkStore`]/
//! [`VectorStore`] pair instead of an in-memory fuzzy matcher.

mod boost;
mod fusion;
mod tokenize;

use std::collections::HashSet;
use std::path::{Component, Path};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::domain::types::{SearchOptions, SearchResult};
use crate::domain::{Error, Result};
use crate::embedding::EmbeddingProvider;
use crate::index::IndexManager;

pub use tokenize::{is_camel_case_identifier, prepare_fts_query, tokenize};

/// Candidate pool multiplier: each lane is asked for more than `limit`
/// results so RRF fusion and boosting have enough material to re-rank over.
const CANDIDATE_MULTIPLIER: usize = 4;

/// Hybrid search engine. Stateless beyond its embedding provider — it reads
/// through whichever [`IndexManager`] is passed to it, per call, rather than
/// owning one itself.
pub struct HybridSearch {
    provider: Arc<dyn EmbeddingProvider>,
}

impl HybridSearch {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Search a single index (no overlay).
    pub async fn search(&self, index: &IndexManager, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        self.search_at_depth(index, query.to_string(), options, options.multi_hop).await
    }

    /// Search `local`, and if `remote` is configured, search it too and
    /// merge with local-over-remote dedup by normalised path (spec.md
    /// §4.7's overlay step). Both indexes are queried concurrently.
    pub async fn search_with_overlay(
        &self,
        local: &IndexManager,
        remote: Option<&IndexManager>,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let Some(remote) = remote else {
            return self.search(local, query, options).await;
        };
        let (local_results, remote_results) =
            tokio::try_join!(self.search(local, query, options), self.search(remote, query, options))?;
        Ok(merge_overlay(local_results, remote_results, options.limit))
    }

    /// One fusion pass plus, if `depth > 0`, a single reference-following
    /// multi-hop widening. Boxed because multi-hop recursion would
    /// otherwise give `async fn` an infinite-size future.
    fn search_at_depth<'a>(
        &'a self,
        index: &'a IndexManager,
        query: String,
        options: &'a SearchOptions,
        depth: usize,
    ) -> BoxFuture<'a, Result<Vec<SearchResult>>> {
        async move {
            let mut results = self.search_once(index, &query, options).await?;

            if depth == 0 || results.is_empty() {
                return Ok(results);
            }

            let hop_window = options.limit.min(5).min(results.len());
            let mut seen = HashSet::new();
            let follow_up_terms: Vec<String> = results[..hop_window]
                .iter()
                .flat_map(|r| r.chunk.references.iter().cloned())
                .filter(|term| seen.insert(term.clone()))
                .collect();

            if follow_up_terms.is_empty() {
                return Ok(results);
            }

            let follow_up_query = follow_up_terms.join(" ");
            let mut hop_results = self.search_at_depth(index, follow_up_query, options, depth - 1).await?;
            for result in &mut hop_results {
                result.is_multi_hop = true;
            }

            results = union_by_chunk_id(results, hop_results);
            results.sort();
            results.truncate(options.limit);
            Ok(results)
        }
        .boxed()
    }

    /// Single BM25 + semantic + RRF + CamelCase-boost pass, no multi-hop.
    async fn search_once(&self, index: &IndexManager, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let tokens = tokenize(query);
        let camel_terms: Vec<&str> = tokens.iter().map(String::as_str).filter(|t| is_camel_case_identifier(t)).collect();

        let candidate_limit = options.limit.saturating_mul(CANDIDATE_MULTIPLIER).max(options.limit);

        let prepared = prepare_fts_query(&tokens);
        let lexical = index.chunk_store().search_bm25(&prepared, candidate_limit).await?;

        let semantic = if options.semantic_weight > 0.0 {
            let query_vector = self.provider.embed_batch(&[query.to_string()]).await?;
            let query_vector = query_vector.into_iter().next().unwrap_or_default();
            index
                .vector_store()
                .search(&query_vector, candidate_limit)?
                .into_iter()
                .filter(|(_, score)| *score >= options.min_similarity)
                .collect()
        } else {
            Vec::new()
        };

        let fused = fusion::fuse_rrf(&lexical, &semantic, options.semantic_weight, options.rrf_k);

        let path_pattern = options
            .path_filter
            .as_deref()
            .map(glob::Pattern::new)
            .transpose()
            .map_err(|e| Error::invalid_argument(format!("invalid path_filter glob: {e}")))?;

        let mut results = Vec::with_capacity(fused.len());
        for (id, candidate) in fused {
            let Some(chunk) = index.chunk_store().get_chunk(&id).await? else {
                continue;
            };
            if let Some(pattern) = &path_pattern {
                if !pattern.matches(&chunk.path) {
                    continue;
                }
            }

            let multiplier = boost::camel_case_multiplier(&camel_terms, &chunk);
            results.push(SearchResult {
                score: candidate.rrf_score * multiplier,
                bm25_score: candidate.bm25_score,
                semantic_score: candidate.semantic_score,
                bm25_rank: candidate.bm25_rank,
                semantic_rank: candidate.semantic_rank,
                is_multi_hop: false,
                chunk,
            });
        }

        results.sort();
        results.truncate(options.limit);
        Ok(results)
    }
}

/// Union two result sets, keeping the first (original, non-hop) occurrence
/// of any chunk id that appears in both.
fn union_by_chunk_id(base: Vec<SearchResult>, extra: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen: HashSet<String> = base.iter().map(|r| r.chunk.id.clone()).collect();
    let mut merged = base;
    for result in extra {
        if seen.insert(result.chunk.id.clone()) {
            merged.push(result);
        }
    }
    merged
}

/// Local-over-remote path-keyed dedup: normalise each result's path
/// lexically, and when local and remote both produced a result at the same
/// normalised path, keep only the local one. Union the remainder, re-sort,
/// cap at `limit`.
fn merge_overlay(local: Vec<SearchResult>, remote: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
    let local_paths: HashSet<String> = local.iter().map(|r| normalize_path(&r.chunk.path)).collect();
    let mut merged = local;
    for result in remote {
        if !local_paths.contains(&normalize_path(&result.chunk.path)) {
            merged.push(result);
        }
    }
    merged.sort();
    merged.truncate(limit);
    merged
}

/// Lexical path canonicalisation: resolve `.`/`..` components and normalise
/// separators without touching the filesystem (indexed paths are often
/// repo-relative and may not exist on this machine at all).
fn normalize_path(path: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            Component::Normal(part) => out.push(part.to_string_lossy().into_owned()),
            Component::RootDir | Component::Prefix(_) => out.push(component.as_os_str().to_string_lossy().into_owned()),
        }
    }
    out.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Chunk, ChunkKind};
    use crate::embedding::NullEmbeddingProvider;
    use crate::index::IndexManager;
    use crate::store::{ChunkStore, VectorStore};

    async fn index_with(chunks: &[(&str, u32, &str, Vec<&str>, Vec<&str>)]) -> IndexManager {
        let mut mgr = IndexManager::new(ChunkStore::open_in_memory().await.unwrap(), VectorStore::new(4));
        for (path, line, content, symbols, references) in chunks {
            let mut chunk = Chunk::new(path.to_string(), *line, *line, ChunkKind::Function, content.to_string(), "rust".to_string());
            chunk.symbols = symbols.iter().map(|s| s.to_string()).collect();
            chunk.references = references.iter().map(|s| s.to_string()).collect();
            mgr.index(chunk, vec![0.0, 0.0, 0.0, 0.0]).await.unwrap();
        }
        mgr
    }

    fn engine() -> HybridSearch {
        HybridSearch::new(Arc::new(NullEmbeddingProvider::new(4)))
    }

    #[tokio::test]
    async fn bm25_only_search_finds_matching_content() {
        let index = index_with(&[
            ("a.rs", 1, "fn authenticate_user() {}", vec!["authenticate_user"], vec![]),
            ("b.rs", 1, "fn unrelated() {}", vec!["unrelated"], vec![]),
        ])
        .await;
        let options = SearchOptions { semantic_weight: 0.0, ..Default::default() };
        let results = engine().search(&index, "authenticate", &options).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.path, "a.rs");
    }

    #[tokio::test]
    async fn exact_symbol_match_outranks_substring_match() {
        let index = index_with(&[
            ("a.rs", 1, "fn helper() { authenticateUser(); }", vec!["helper"], vec!["authenticateUser"]),
            ("b.rs", 1, "fn authenticateUser() {}", vec!["authenticateUser"], vec![]),
        ])
        .await;
        let options = SearchOptions { semantic_weight: 0.0, ..Default::default() };
        let results = engine().search(&index, "authenticateUser", &options).await.unwrap();
        assert_eq!(results[0].chunk.path, "b.rs");
    }

    #[tokio::test]
    async fn path_filter_excludes_non_matching_paths() {
        let index = index_with(&[
            ("src/auth.rs", 1, "fn login() {}", vec!["login"], vec![]),
            ("src/docs.rs", 1, "fn login_docs() {}", vec!["login_docs"], vec![]),
        ])
        .await;
        let options = SearchOptions {
            semantic_weight: 0.0,
            path_filter: Some("src/auth.*".to_string()),
            ..Default::default()
        };
        let results = engine().search(&index, "login", &options).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.path, "src/auth.rs");
    }

    #[tokio::test]
    async fn multi_hop_pulls_in_referenced_chunks() {
        let index = index_with(&[
            ("a.rs", 1, "fn entry() { helperFunction(); }", vec!["entry"], vec!["helperFunction"]),
            ("b.rs", 1, "fn helperFunction() {}", vec!["helperFunction"], vec![]),
        ])
        .await;
        let options = SearchOptions { semantic_weight: 0.0, multi_hop: 1, ..Default::default() };
        let results = engine().search(&index, "entry", &options).await.unwrap();
        assert!(results.iter().any(|r| r.chunk.path == "b.rs" && r.is_multi_hop));
    }

    #[test]
    fn overlay_merge_prefers_local_on_path_collision() {
        let local_chunk = Chunk::new("src/a.rs".to_string(), 1, 1, ChunkKind::Function, "local".to_string(), "rust".to_string());
        let remote_chunk = Chunk::new("src/a.rs".to_string(), 1, 1, ChunkKind::Function, "remote".to_string(), "rust".to_string());
        let local = vec![SearchResult {
            chunk: local_chunk,
            score: 1.0,
            bm25_score: 1.0,
            semantic_score: 0.0,
            bm25_rank: Some(1),
            semantic_rank: None,
            is_multi_hop: false,
        }];
        let remote = vec![SearchResult {
            chunk: remote_chunk,
            score: 5.0,
            bm25_score: 5.0,
            semantic_score: 0.0,
            bm25_rank: Some(1),
            semantic_rank: None,
            is_multi_hop: false,
        }];
        let merged = merge_overlay(local, remote, 10);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].chunk.content, "local");
    }

    #[test]
    fn normalize_path_resolves_parent_components() {
        assert_eq!(normalize_path("src/../src/a.rs"), "src/a.rs");
        assert_eq!(normalize_path("./src/a.rs"), "src/a.rs");
    }
}
