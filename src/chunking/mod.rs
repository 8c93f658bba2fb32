//! Parser dispatcher: routes a `(path, content)` pair to a language-specific
//! parser and normalizes its output into [`Chunk`]s and [`InfoSnippet`]s.
//!
//! ## Architecture
//!
//! ```text
//! (path, content)
//!     |
//!     v
//! extension lookup
//!     |-- tree-sitter grammar registered --> treewalk::extract (+ fallback::chunk_with_patterns on parse failure)
//!     |-- markdown --------------------------> markdown::extract
//!     |-- json / yaml -----------------------> structured::extract
//!     |-- unknown ----------------------------> plaintext::chunk_windowed
//! ```
//!
//! Every tier shares the same doc-comment/signature/breadcrumb helpers in
//! [`signature`] and the same type-declaration-splitting rule: a class,
//! struct, actor, protocol, enum, or extension that introduces a conformance
//! is emitted as two chunks — a lightweight declaration-only chunk
//! (`is_type_declaration = true`) and the full body chunk.

mod fallback;
mod languages;
mod markdown;
mod plaintext;
mod signature;
mod structured;
mod treewalk;

use crate::domain::types::{Chunk, InfoSnippet};
use thiserror::Error;

pub use languages::language_name_for_extension;

/// Errors the parser dispatcher can surface.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("content is empty or whitespace-only")]
    EmptyContent,

    #[error("invalid glob pattern: {0}")]
    InvalidGlobPattern(String),

    #[error("directory enumeration failed: {0}")]
    DirectoryEnumerationFailed(String),

    #[error("failed to encode parse output as JSON: {0}")]
    JsonEncodingFailed(String),

    #[error("grammar parse failed for {path}: {reason}")]
    GrammarFailed { path: String, reason: String },
}

/// Tunables for the plain-text fallback chunker.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingLimits {
    pub max_chunk_size: usize,
    pub overlap_size: usize,
}

impl Default for ChunkingLimits {
    fn default() -> Self {
        Self {
            max_chunk_size: 2000,
            overlap_size: 200,
        }
    }
}

/// Parse `content` (the bytes of `path`) into chunks and info snippets.
///
/// Empty or whitespace-only input is rejected with [`ParseError::EmptyContent`]
/// regardless of extension — there is nothing semantically useful to index.
pub fn parse(
    path: &str,
    content: &str,
    limits: ChunkingLimits,
) -> Result<(Vec<Chunk>, Vec<InfoSnippet>), ParseError> {
    if content.trim().is_empty() {
        return Err(ParseError::EmptyContent);
    }

    let ext = std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "md" | "markdown" => Ok(markdown::extract(path, content)),
        "json" => Ok((structured::extract_json(path, content), Vec::new())),
        "yaml" | "yml" => Ok((structured::extract_yaml(path, content), Vec::new())),
        _ => {
            if let Some(spec) = languages::lookup(&ext) {
                let chunks = treewalk::extract(path, content, spec).unwrap_or_else(|_| {
                    fallback::chunk_with_patterns(path, content, spec.language_name)
                });
                let chunks = if chunks.is_empty() {
                    fallback::chunk_with_patterns(path, content, spec.language_name)
                } else {
                    chunks
                };
                Ok((chunks, Vec::new()))
            } else {
                Ok((plaintext::chunk_windowed(path, content, limits), Vec::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_is_rejected() {
        let result = parse("x.rs", "   \n\t", ChunkingLimits::default());
        assert!(matches!(result, Err(ParseError::EmptyContent)));
    }

    #[test]
    fn unknown_extension_falls_back_to_windowed_plaintext() {
        let (chunks, snippets) = parse("notes.xyz", "hello\nworld\n", ChunkingLimits::default()).unwrap();
        assert!(!chunks.is_empty());
        assert!(snippets.is_empty());
    }

    #[test]
    fn rust_file_produces_function_chunk() {
        let src = "pub fn authenticate(user: &str) -> bool {\n    user.len() > 0\n}\n";
        let (chunks, _) = parse("auth.rs", src, ChunkingLimits::default()).unwrap();
        assert!(chunks.iter().any(|c| c.symbols.iter().any(|s| s == "authenticate")));
    }
}
