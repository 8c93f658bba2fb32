//! SQLite-backed row store for [`Chunk`]s and [`InfoSnippet`]s, with an
//! FTS5 virtual table kept in sync by hand (the same standalone-`fts5`
//! pattern — not an external-content table — as the teacher's sibling
//! `context-harness` crate, since our primary key is a text content hash
//! rather than an integer rowid).

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::domain::types::{Chunk, ChunkKind, InfoSnippet, SnippetKind};
use crate::domain::{Error, Result};

/// Owns the connection pool to `<data_dir>/chunks.db` and every query
/// against the `chunks`, `snippets`, `chunks_fts`, and `file_hashes` tables.
pub struct ChunkStore {
    pool: SqlitePool,
}

impl ChunkStore {
    /// Open (creating if missing) the chunk database at `path` and run
    /// migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| Error::store(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// In-memory store, for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                path TEXT NOT NULL,
                content TEXT NOT NULL,
                start_line INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                kind TEXT NOT NULL,
                symbols_json TEXT NOT NULL,
                refs_json TEXT NOT NULL,
                file_hash TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                doc_comment TEXT,
                signature TEXT,
                breadcrumb TEXT,
                language TEXT NOT NULL,
                token_count INTEGER NOT NULL,
                generated_description TEXT,
                conformances_json TEXT NOT NULL,
                is_type_declaration INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snippets (
                id TEXT PRIMARY KEY,
                path TEXT NOT NULL,
                content TEXT NOT NULL,
                start_line INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                kind TEXT NOT NULL,
                chunk_id TEXT,
                breadcrumb TEXT,
                language TEXT NOT NULL,
                token_count INTEGER NOT NULL,
                content_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS file_hashes (
                path TEXT PRIMARY KEY,
                file_hash TEXT NOT NULL,
                indexed_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        let fts_exists: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='chunks_fts'",
        )
        .fetch_one(&self.pool)
        .await?;
        if !fts_exists {
            sqlx::query(
                r#"
                CREATE VIRTUAL TABLE chunks_fts USING fts5(
                    chunk_id UNINDEXED,
                    path UNINDEXED,
                    symbols,
                    references_text,
                    doc_comment,
                    signature,
                    breadcrumb,
                    content
                )
                "#,
            )
            .execute(&self.pool)
            .await?;
        }

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_path ON chunks(path)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_snippets_path ON snippets(path)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn upsert_chunk(&self, chunk: &Chunk) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        upsert_chunk_tx(&mut tx, chunk).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for chunk in chunks {
            upsert_chunk_tx(&mut tx, chunk).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn upsert_snippets(&self, snippets: &[InfoSnippet]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for snippet in snippets {
            sqlx::query(
                r#"
                INSERT INTO snippets (id, path, content, start_line, end_line, kind,
                    chunk_id, breadcrumb, language, token_count, content_hash, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    content = excluded.content, start_line = excluded.start_line,
                    end_line = excluded.end_line, breadcrumb = excluded.breadcrumb,
                    content_hash = excluded.content_hash
                "#,
            )
            .bind(&snippet.id)
            .bind(&snippet.path)
            .bind(&snippet.content)
            .bind(snippet.start_line)
            .bind(snippet.end_line)
            .bind(snippet_kind_str(snippet.kind))
            .bind(&snippet.chunk_id)
            .bind(&snippet.breadcrumb)
            .bind(&snippet.language)
            .bind(snippet.token_count as i64)
            .bind(&snippet.content_hash)
            .bind(snippet.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Remove every chunk (and its FTS row) at `path`, returning the removed
    /// chunk ids so the caller can evict matching vectors.
    pub async fn delete_chunks_for_path(&self, path: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM chunks WHERE path = ?")
            .bind(path)
            .fetch_all(&self.pool)
            .await?;
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks WHERE path = ?").bind(path).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM chunks_fts WHERE path = ?").bind(path).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM snippets WHERE path = ?").bind(path).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(ids)
    }

    pub async fn get_chunk(&self, id: &str) -> Result<Option<Chunk>> {
        let row = sqlx::query("SELECT * FROM chunks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_chunk(&r)).transpose()
    }

    pub async fn chunks_by_path(&self, path: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query("SELECT * FROM chunks WHERE path = ? ORDER BY start_line")
            .bind(path)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_chunk).collect()
    }

    pub async fn all_chunk_ids(&self) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar("SELECT id FROM chunks").fetch_all(&self.pool).await?)
    }

    /// Every distinct path with at least one indexed chunk.
    pub async fn all_paths(&self) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar("SELECT DISTINCT path FROM chunks").fetch_all(&self.pool).await?)
    }

    /// Fetch chunks by id, skipping any id with no matching row.
    pub async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Chunk>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(chunk) = self.get_chunk(id).await? {
                out.push(chunk);
            }
        }
        Ok(out)
    }

    /// One chunk per requested content hash (any tie-break among rows
    /// sharing a hash), keyed by hash.
    pub async fn get_by_content_hashes(&self, hashes: &HashSet<String>) -> Result<HashMap<String, Chunk>> {
        let mut out = HashMap::with_capacity(hashes.len());
        for hash in hashes {
            let row = sqlx::query("SELECT * FROM chunks WHERE content_hash = ? LIMIT 1")
                .bind(hash)
                .fetch_optional(&self.pool)
                .await?;
            if let Some(row) = row {
                out.insert(hash.clone(), row_to_chunk(&row)?);
            }
        }
        Ok(out)
    }

    /// Remove a single chunk by id (and its FTS row). No-op if absent.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks WHERE id = ?").bind(id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM chunks_fts WHERE chunk_id = ?").bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Alias for [`Self::delete_chunks_for_path`], named to match the
    /// operation list's `delete_by_path`.
    pub async fn delete_by_path(&self, path: &str) -> Result<Vec<String>> {
        self.delete_chunks_for_path(path).await
    }

    /// Raw document frequency of `term` across indexed content — how many
    /// chunks contain it at least once — used by callers wanting a cheap
    /// relevance signal outside full BM25 ranking.
    pub async fn get_term_frequency(&self, term: &str) -> Result<usize> {
        if term.trim().is_empty() {
            return Ok(0);
        }
        let pattern = format!("\"{}\"", term.replace('"', "\"\""));
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks_fts WHERE chunks_fts MATCH ?")
            .bind(pattern)
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0);
        Ok(count as usize)
    }

    /// Find the id of any existing chunk sharing `content_hash`, used by
    /// [`crate::index::IndexManager::reindex_with_change_detection`] to
    /// reuse embeddings across moved/renamed/unchanged content.
    pub async fn find_id_by_content_hash(&self, content_hash: &str) -> Result<Option<String>> {
        Ok(sqlx::query_scalar("SELECT id FROM chunks WHERE content_hash = ? LIMIT 1")
            .bind(content_hash)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn stored_content_hash(&self, id: &str) -> Result<Option<String>> {
        Ok(sqlx::query_scalar("SELECT content_hash FROM chunks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn chunk_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks").fetch_one(&self.pool).await?;
        Ok(count as usize)
    }

    pub async fn file_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT path) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    pub async fn record_file_hash(&self, path: &str, hash: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO file_hashes (path, file_hash, indexed_at) VALUES (?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET file_hash = excluded.file_hash, indexed_at = excluded.indexed_at
            "#,
        )
        .bind(path)
        .bind(hash)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Whether `hash` has been recorded for any path, not just `path` —
    /// [`crate::index::IndexManager::needs_indexing`] is a pure content
    /// check.
    pub async fn has_file_hash(&self, hash: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_hashes WHERE file_hash = ?")
            .bind(hash)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn stored_file_hash(&self, path: &str) -> Result<Option<String>> {
        Ok(sqlx::query_scalar("SELECT file_hash FROM file_hashes WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn clear(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM chunks_fts").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM snippets").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM file_hashes").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    /// BM25 lexical search. `query` must already be valid FTS5 MATCH syntax
    /// (quoted phrases for exact terms, `term*` for prefixes) — callers that
    /// only have free text should quote it themselves, e.g. via
    /// [`crate::search::prepare_fts_query`]. FTS5 reports `rank` as a
    /// negative value (lower is better); we negate it so higher is better,
    /// matching the rest of the search pipeline's "higher score wins"
    /// convention.
    pub async fn search_bm25(&self, query: &str, limit: usize) -> Result<Vec<(String, f32)>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT chunk_id, bm25(chunks_fts, 0.0, 0.0, 2.0, 1.0, 1.0, 1.5, 0.5, 5.0) AS score
            FROM chunks_fts
            WHERE chunks_fts MATCH ?
            ORDER BY score
            LIMIT ?
            "#,
        )
        .bind(query)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| {
                let raw: f64 = r.get("score");
                (r.get::<String, _>("chunk_id"), -raw as f32)
            })
            .collect())
    }
}

async fn upsert_chunk_tx(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, chunk: &Chunk) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO chunks (id, path, content, start_line, end_line, kind, symbols_json,
            refs_json, file_hash, content_hash, doc_comment, signature, breadcrumb,
            language, token_count, generated_description, conformances_json,
            is_type_declaration, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            content = excluded.content, content_hash = excluded.content_hash,
            file_hash = excluded.file_hash, doc_comment = excluded.doc_comment,
            signature = excluded.signature, breadcrumb = excluded.breadcrumb,
            generated_description = excluded.generated_description
        "#,
    )
    .bind(&chunk.id)
    .bind(&chunk.path)
    .bind(&chunk.content)
    .bind(chunk.start_line)
    .bind(chunk.end_line)
    .bind(chunk.kind.to_string())
    .bind(serde_json::to_string(&chunk.symbols)?)
    .bind(serde_json::to_string(&chunk.references)?)
    .bind(&chunk.file_hash)
    .bind(&chunk.content_hash)
    .bind(&chunk.doc_comment)
    .bind(&chunk.signature)
    .bind(&chunk.breadcrumb)
    .bind(&chunk.language)
    .bind(chunk.token_count as i64)
    .bind(&chunk.generated_description)
    .bind(serde_json::to_string(&chunk.conformances)?)
    .bind(chunk.is_type_declaration)
    .bind(chunk.created_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;

    sqlx::query("DELETE FROM chunks_fts WHERE chunk_id = ?")
        .bind(&chunk.id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO chunks_fts (chunk_id, path, symbols, references_text, doc_comment, signature, breadcrumb, content)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&chunk.id)
    .bind(&chunk.path)
    .bind(chunk.symbols.join(" "))
    .bind(chunk.references.join(" "))
    .bind(chunk.doc_comment.as_deref().unwrap_or(""))
    .bind(chunk.signature.as_deref().unwrap_or(""))
    .bind(chunk.breadcrumb.as_deref().unwrap_or(""))
    .bind(&chunk.content)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Result<Chunk> {
    let symbols: Vec<String> = serde_json::from_str(row.get::<&str, _>("symbols_json"))?;
    let references: Vec<String> = serde_json::from_str(row.get::<&str, _>("refs_json"))?;
    let conformances: Vec<String> = serde_json::from_str(row.get::<&str, _>("conformances_json"))?;
    let kind = ChunkKind::from_str(row.get::<&str, _>("kind")).map_err(Error::internal)?;
    let created_at: DateTime<Utc> = row
        .get::<&str, _>("created_at")
        .parse()
        .map_err(|e: chrono::ParseError| Error::internal(e.to_string()))?;

    Ok(Chunk {
        id: row.get("id"),
        path: row.get("path"),
        content: row.get("content"),
        start_line: row.get::<i64, _>("start_line") as u32,
        end_line: row.get::<i64, _>("end_line") as u32,
        kind,
        symbols,
        references,
        file_hash: row.get("file_hash"),
        content_hash: row.get("content_hash"),
        doc_comment: row.get("doc_comment"),
        signature: row.get("signature"),
        breadcrumb: row.get("breadcrumb"),
        language: row.get("language"),
        token_count: row.get::<i64, _>("token_count") as usize,
        generated_description: row.get("generated_description"),
        conformances,
        is_type_declaration: row.get("is_type_declaration"),
        created_at,
    })
}

fn snippet_kind_str(kind: SnippetKind) -> &'static str {
    match kind {
        SnippetKind::Documentation => "documentation",
        SnippetKind::MarkdownSection => "markdown_section",
        SnippetKind::ApiDocumentation => "api_documentation",
        SnippetKind::Example => "example",
        SnippetKind::Annotation => "annotation",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ChunkKind;

    async fn store() -> ChunkStore {
        ChunkStore::open_in_memory().await.unwrap()
    }

    fn sample_chunk() -> Chunk {
        Chunk::new(
            "src/auth.rs".into(),
            10,
            20,
            ChunkKind::Function,
            "fn authenticate(user: &str) -> bool { true }".into(),
            "rust".into(),
        )
    }

    #[tokio::test]
    async fn round_trips_a_chunk() {
        let store = store().await;
        let chunk = sample_chunk();
        store.upsert_chunk(&chunk).await.unwrap();
        let fetched = store.get_chunk(&chunk.id).await.unwrap().unwrap();
        assert_eq!(fetched.path, chunk.path);
        assert_eq!(fetched.content, chunk.content);
    }

    #[tokio::test]
    async fn bm25_search_finds_matching_content() {
        let store = store().await;
        store.upsert_chunk(&sample_chunk()).await.unwrap();
        let hits = store.search_bm25("authenticate", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn bm25_search_matches_doc_comment_and_signature() {
        let store = store().await;
        let mut chunk = sample_chunk();
        chunk.doc_comment = Some("Handles inbound login attempts.".to_string());
        chunk.signature = Some("fn authenticate(user: &str) -> bool".to_string());
        store.upsert_chunk(&chunk).await.unwrap();

        assert_eq!(store.search_bm25("inbound", 10).await.unwrap().len(), 1);
        assert_eq!(store.search_bm25("authenticate", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_by_content_hashes_returns_one_chunk_per_hash() {
        let store = store().await;
        let chunk = sample_chunk();
        store.upsert_chunk(&chunk).await.unwrap();
        let hashes: HashSet<String> = [chunk.content_hash.clone()].into_iter().collect();
        let found = store.get_by_content_hashes(&hashes).await.unwrap();
        assert_eq!(found.get(&chunk.content_hash).map(|c| &c.id), Some(&chunk.id));
    }

    #[tokio::test]
    async fn delete_by_id_is_a_no_op_for_missing_ids() {
        let store = store().await;
        store.delete("does-not-exist").await.unwrap();
    }

    #[tokio::test]
    async fn get_term_frequency_counts_matching_chunks() {
        let store = store().await;
        store.upsert_chunk(&sample_chunk()).await.unwrap();
        assert_eq!(store.get_term_frequency("authenticate").await.unwrap(), 1);
        assert_eq!(store.get_term_frequency("nonexistent").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_chunks_for_path_removes_fts_rows_too() {
        let store = store().await;
        let chunk = sample_chunk();
        store.upsert_chunk(&chunk).await.unwrap();
        store.delete_chunks_for_path(&chunk.path).await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 0);
        assert!(store.search_bm25("authenticate", 10).await.unwrap().is_empty());
    }
}
