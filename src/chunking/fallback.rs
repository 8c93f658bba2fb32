//! Regex/brace-matching fallback chunker.
//!
//! Used when a registered grammar fails to parse a file (syntax errors,
//! grammar version skew) or produces zero declarations — the same safety
//! net the teacher's generic fallback chunker provided for files its
//! primary parser couldn't handle.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::hashing::file_hash;
use crate::domain::types::{ordered_insert, Chunk, ChunkKind};

static DECLARATION_PATTERNS: LazyLock<Vec<(Regex, ChunkKind)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+(\w+)").unwrap(),
            ChunkKind::Function,
        ),
        (
            Regex::new(r"(?m)^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s+(\w+)").unwrap(),
            ChunkKind::Function,
        ),
        (
            Regex::new(r"(?m)^\s*def\s+(\w+)\s*\(").unwrap(),
            ChunkKind::Function,
        ),
        (
            Regex::new(r"(?m)^\s*(?:public|private|protected|internal|static|\s)*\b(?:class|struct|enum|interface|trait)\s+(\w+)").unwrap(),
            ChunkKind::Class,
        ),
        (
            Regex::new(r"(?m)^\s*func\s+(\w+)").unwrap(),
            ChunkKind::Function,
        ),
    ]
});

/// Split `content` into chunks by scanning for declaration-like lines, then
/// growing each chunk to its matching closing brace (or end of file, for
/// brace-less languages like Python).
pub fn chunk_with_patterns(path: &str, content: &str, language: &str) -> Vec<Chunk> {
    let lines: Vec<&str> = content.lines().collect();
    let whole_file_hash = file_hash(content.as_bytes());
    let mut matches: Vec<(usize, ChunkKind, String)> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        for (pattern, kind) in DECLARATION_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(line) {
                let name = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
                matches.push((idx, *kind, name));
                break;
            }
        }
    }

    if matches.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    for (i, (start_idx, kind, name)) in matches.iter().enumerate() {
        let next_start = matches.get(i + 1).map(|(idx, _, _)| *idx).unwrap_or(lines.len());
        let end_idx = find_block_end(&lines, *start_idx, next_start);
        let body = lines[*start_idx..end_idx].join("\n");
        if body.trim().is_empty() {
            continue;
        }
        let mut chunk = Chunk::new(
            path.to_string(),
            *start_idx as u32 + 1,
            end_idx as u32,
            *kind,
            body,
            language.to_string(),
        )
        .with_file_hash(whole_file_hash.clone());
        if !name.is_empty() {
            ordered_insert(&mut chunk.symbols, name.clone());
        }
        chunks.push(chunk);
    }
    chunks
}

/// Grow from `start` to the line where net brace depth returns to zero, or
/// to `limit` if the language has no braces (opened count stays at zero).
fn find_block_end(lines: &[&str], start: usize, limit: usize) -> usize {
    let mut depth = 0i32;
    let mut opened = false;
    for (offset, line) in lines[start..limit.max(start + 1).min(lines.len())].iter().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return start + offset + 1;
        }
    }
    limit.min(lines.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_rust_function_by_pattern() {
        let src = "fn helper() {\n    1\n}\n\nfn other() {\n    2\n}\n";
        let chunks = chunk_with_patterns("x.rs", src, "rust");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].symbols, vec!["helper".to_string()]);
    }

    #[test]
    fn empty_file_yields_no_chunks() {
        assert!(chunk_with_patterns("x.rs", "// just a comment\n", "rust").is_empty());
    }
}
