//! Core Data Model
//!
//! Defines the fundamental entities of the code-intelligence engine: the
//! [`Chunk`] produced by parsing, its documentation sibling [`InfoSnippet`],
//! the [`VectorRecord`] that keys a chunk into the ANN index, and the ranked
//! [`SearchResult`] returned by hybrid search.
//!
//! # Example: shape of an indexed chunk
//!
//! ```rust
//! use mcp_context_browser::domain::types::{Chunk, ChunkKind};
//!
//! let chunk = Chunk::new(
//!     "src/auth.rs".to_string(),
//!     10,
//!     12,
//!     ChunkKind::Function,
//!     "fn authenticate(user: &str) -> bool { true }".to_string(),
//!     "rust".to_string(),
//! );
//!
//! assert!(chunk.start_line <= chunk.end_line);
//! assert_eq!(chunk.id, chunk.id.clone());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hashing::{chunk_id, content_hash};

/// Kind of semantic unit a [`Chunk`] represents.
///
/// Each variant projects onto the boosting/classification predicates used by
/// [`crate::search`]: `is_callable`, `is_type_declaration`, `language_family`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Function,
    Method,
    Class,
    Struct,
    Enum,
    Protocol,
    Actor,
    Extension,
    Initializer,
    Subscript,
    Typealias,
    Variable,
    Constant,
    Document,
    Comment,
    Unknown,
}

impl ChunkKind {
    /// Whether this kind is an invocable unit (function-like).
    pub fn is_callable(self) -> bool {
        matches!(
            self,
            ChunkKind::Function | ChunkKind::Method | ChunkKind::Initializer | ChunkKind::Subscript
        )
    }

    /// Whether this kind introduces a type (eligible for a type-declaration
    /// sibling chunk, see [`crate::chunking`]).
    pub fn is_type_declaration(self) -> bool {
        matches!(
            self,
            ChunkKind::Class
                | ChunkKind::Struct
                | ChunkKind::Enum
                | ChunkKind::Protocol
                | ChunkKind::Actor
                | ChunkKind::Extension
                | ChunkKind::Typealias
        )
    }

    /// Coarse language family used to bucket cross-language search boosts.
    pub fn language_family(self) -> &'static str {
        match self {
            ChunkKind::Protocol | ChunkKind::Actor | ChunkKind::Extension | ChunkKind::Initializer => {
                "swift-like"
            }
            ChunkKind::Document | ChunkKind::Comment => "documentation",
            _ => "structural",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ChunkKind::Function => "function",
            ChunkKind::Method => "method",
            ChunkKind::Class => "class",
            ChunkKind::Struct => "struct",
            ChunkKind::Enum => "enum",
            ChunkKind::Protocol => "protocol",
            ChunkKind::Actor => "actor",
            ChunkKind::Extension => "extension",
            ChunkKind::Initializer => "initializer",
            ChunkKind::Subscript => "subscript",
            ChunkKind::Typealias => "typealias",
            ChunkKind::Variable => "variable",
            ChunkKind::Constant => "constant",
            ChunkKind::Document => "document",
            ChunkKind::Comment => "comment",
            ChunkKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChunkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "function" => Ok(ChunkKind::Function),
            "method" => Ok(ChunkKind::Method),
            "class" => Ok(ChunkKind::Class),
            "struct" => Ok(ChunkKind::Struct),
            "enum" => Ok(ChunkKind::Enum),
            "protocol" => Ok(ChunkKind::Protocol),
            "actor" => Ok(ChunkKind::Actor),
            "extension" => Ok(ChunkKind::Extension),
            "initializer" => Ok(ChunkKind::Initializer),
            "subscript" => Ok(ChunkKind::Subscript),
            "typealias" => Ok(ChunkKind::Typealias),
            "variable" => Ok(ChunkKind::Variable),
            "constant" => Ok(ChunkKind::Constant),
            "document" => Ok(ChunkKind::Document),
            "comment" => Ok(ChunkKind::Comment),
            "unknown" => Ok(ChunkKind::Unknown),
            other => Err(format!("unrecognized chunk kind: {other}")),
        }
    }
}

/// An indexed semantic unit: a contiguous span of source text keyed by a
/// stable, content-derived id.
///
/// `id` is a pure function of `(path, start_line, kind, content_hash)`, so
/// re-parsing identical content at the same location always yields the same
/// id — this is what lets [`crate::index::IndexManager::reindex_with_change_detection`]
/// reuse embeddings across incremental reindexes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub path: String,
    pub content: String,
    pub start_line: u32,
    pub end_line: u32,
    pub kind: ChunkKind,
    /// Ordered, deduplicated identifiers this chunk defines.
    pub symbols: Vec<String>,
    /// Ordered, deduplicated identifiers this chunk references.
    pub references: Vec<String>,
    /// Hash of the whole file at ingest time.
    pub file_hash: String,
    /// Hash of `content` alone; a pure function of `content`.
    pub content_hash: String,
    pub doc_comment: Option<String>,
    pub signature: Option<String>,
    /// E.g. `"Outer > Inner > method"`.
    pub breadcrumb: Option<String>,
    pub language: String,
    /// Approximate token count, `len(content) / 4`.
    pub token_count: usize,
    pub generated_description: Option<String>,
    /// Ordered, deduplicated conformance/inheritance names.
    pub conformances: Vec<String>,
    pub is_type_declaration: bool,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Build a chunk, deriving `content_hash` and `id` from its fields.
    ///
    /// `file_hash` defaults to `content_hash` (a single-chunk file); callers
    /// indexing a real file should overwrite it with [`Chunk::with_file_hash`].
    pub fn new(
        path: String,
        start_line: u32,
        end_line: u32,
        kind: ChunkKind,
        content: String,
        language: String,
    ) -> Self {
        let content_hash = content_hash(&content);
        let id = chunk_id(&path, start_line, kind, &content_hash);
        let token_count = content.len() / 4;
        Self {
            id,
            path,
            content,
            start_line,
            end_line,
            kind,
            symbols: Vec::new(),
            references: Vec::new(),
            file_hash: content_hash.clone(),
            content_hash,
            doc_comment: None,
            signature: None,
            breadcrumb: None,
            language,
            token_count,
            generated_description: None,
            conformances: Vec::new(),
            is_type_declaration: false,
            created_at: Utc::now(),
        }
    }

    /// Attach the file-level hash (whole file, not just this chunk's span).
    pub fn with_file_hash(mut self, file_hash: String) -> Self {
        self.file_hash = file_hash;
        self
    }

    /// Re-derive `content_hash` and `id` after mutating `content` in place.
    pub fn recompute_hash(&mut self) {
        self.content_hash = content_hash(&self.content);
        self.id = chunk_id(&self.path, self.start_line, self.kind, &self.content_hash);
        self.token_count = self.content.len() / 4;
    }
}

/// Documentation fragment: a Markdown section, API doc block, example, or
/// annotation. Shares [`Chunk`]'s shape minus code-specific fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnippetKind {
    Documentation,
    MarkdownSection,
    ApiDocumentation,
    Example,
    Annotation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfoSnippet {
    pub id: String,
    pub path: String,
    pub content: String,
    pub start_line: u32,
    pub end_line: u32,
    pub kind: SnippetKind,
    /// The code chunk this snippet documents, if any. Stored as a key (not a
    /// pointer) so the two can be looked up independently through the store.
    pub chunk_id: Option<String>,
    pub breadcrumb: Option<String>,
    pub language: String,
    pub token_count: usize,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

impl InfoSnippet {
    pub fn new(
        path: String,
        start_line: u32,
        end_line: u32,
        kind: SnippetKind,
        content: String,
        language: String,
    ) -> Self {
        let content_hash = content_hash(&content);
        let id = chunk_id(&path, start_line, chunk_kind_placeholder(kind), &content_hash);
        let token_count = content.len() / 4;
        Self {
            id,
            path,
            content,
            start_line,
            end_line,
            kind,
            chunk_id: None,
            breadcrumb: None,
            language,
            token_count,
            content_hash,
            created_at: Utc::now(),
        }
    }
}

/// `InfoSnippet` has its own kind space but reuses the same id derivation as
/// `Chunk`; this maps each snippet kind onto a stable `ChunkKind` tag purely
/// so the id hash input is deterministic and collision-free across the two
/// tables (snippets and chunks never share a key space, but within a single
/// table we still want the property that re-parsing identical content
/// reproduces the same id).
fn chunk_kind_placeholder(kind: SnippetKind) -> ChunkKind {
    match kind {
        SnippetKind::Documentation => ChunkKind::Document,
        SnippetKind::MarkdownSection => ChunkKind::Document,
        SnippetKind::ApiDocumentation => ChunkKind::Document,
        SnippetKind::Example => ChunkKind::Document,
        SnippetKind::Annotation => ChunkKind::Comment,
    }
}

/// A single ranked hit from [`crate::search::HybridSearch::search`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
    pub bm25_score: f32,
    pub semantic_score: f32,
    pub bm25_rank: Option<usize>,
    pub semantic_rank: Option<usize>,
    pub is_multi_hop: bool,
}

impl Eq for SearchResult {}

impl PartialOrd for SearchResult {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchResult {
    /// "Lower than" means higher score (sorts first), per spec.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| self.chunk.id.cmp(&other.chunk.id))
    }
}

/// Result of [`crate::index::IndexManager::reindex_with_change_detection`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReindexResult {
    pub total: usize,
    pub reused: usize,
    pub embedded: usize,
}

impl ReindexResult {
    pub fn reuse_percentage(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            (100 * self.reused / self.total) as u32
        }
    }
}

/// Snapshot of [`crate::index::IndexManager`] counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStatistics {
    pub chunk_count: usize,
    pub vector_count: usize,
    pub file_count: usize,
    pub dimension: usize,
    pub is_consistent: bool,
}

/// Result of [`crate::index::IndexManager::verify_consistency`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ConsistencyReport {
    pub missing_vectors: Vec<String>,
    pub orphaned_vectors: Vec<String>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_vectors.is_empty() && self.orphaned_vectors.is_empty()
    }
}

/// Options for [`crate::search::HybridSearch::search`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub semantic_weight: f32,
    pub rrf_k: f32,
    pub multi_hop: usize,
    pub path_filter: Option<String>,
    pub min_similarity: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            semantic_weight: 0.5,
            rrf_k: 60.0,
            multi_hop: 0,
            path_filter: None,
            min_similarity: 0.0,
        }
    }
}

/// Insert a value into an "ordered set" vector: append only if not already
/// present. Used for `symbols`/`references`/`conformances`, which spec.md
/// requires to preserve insertion order (a plain `HashSet` would not).
pub fn ordered_insert(set: &mut Vec<String>, value: String) {
    if !set.iter().any(|existing| existing == &value) {
        set.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_pure_function_of_path_line_kind_content() {
        let a = Chunk::new(
            "a.rs".into(),
            1,
            2,
            ChunkKind::Function,
            "fn x() {}".into(),
            "rust".into(),
        );
        let b = Chunk::new(
            "a.rs".into(),
            1,
            2,
            ChunkKind::Function,
            "fn x() {}".into(),
            "rust".into(),
        );
        assert_eq!(a.id, b.id);
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn id_changes_when_content_changes() {
        let a = Chunk::new("a.rs".into(), 1, 2, ChunkKind::Function, "fn x() {}".into(), "rust".into());
        let b = Chunk::new("a.rs".into(), 1, 2, ChunkKind::Function, "fn y() {}".into(), "rust".into());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn ordered_insert_deduplicates_and_preserves_order() {
        let mut set = Vec::new();
        ordered_insert(&mut set, "b".into());
        ordered_insert(&mut set, "a".into());
        ordered_insert(&mut set, "b".into());
        assert_eq!(set, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn search_result_ordering_is_highest_score_first() {
        let chunk = Chunk::new("a.rs".into(), 1, 1, ChunkKind::Function, "fn a(){}".into(), "rust".into());
        let high = SearchResult {
            chunk: chunk.clone(),
            score: 0.9,
            bm25_score: 0.0,
            semantic_score: 0.0,
            bm25_rank: None,
            semantic_rank: None,
            is_multi_hop: false,
        };
        let low = SearchResult {
            chunk,
            score: 0.1,
            bm25_score: 0.0,
            semantic_score: 0.0,
            bm25_rank: None,
            semantic_rank: None,
            is_multi_hop: false,
        };
        assert!(high < low);
    }
}
