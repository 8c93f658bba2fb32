//! Windowed fallback chunker for extensions with no registered grammar:
//! slide a fixed-size, overlapping window over the file so no unrecognized
//! format is left entirely unindexed.

use super::ChunkingLimits;
use crate::domain::hashing::file_hash;
use crate::domain::types::{Chunk, ChunkKind};

pub fn chunk_windowed(path: &str, content: &str, limits: ChunkingLimits) -> Vec<Chunk> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }
    let whole_file_hash = file_hash(content.as_bytes());

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < lines.len() {
        let mut end = start;
        let mut size = 0usize;
        while end < lines.len() && (size == 0 || size < limits.max_chunk_size) {
            size += lines[end].len() + 1;
            end += 1;
        }
        let body = lines[start..end].join("\n");
        if !body.trim().is_empty() {
            let chunk = Chunk::new(
                path.to_string(),
                start as u32 + 1,
                end as u32,
                ChunkKind::Unknown,
                body,
                "plaintext".to_string(),
            )
            .with_file_hash(whole_file_hash.clone());
            chunks.push(chunk);
        }
        if end >= lines.len() {
            break;
        }
        // Step back by the overlap so each window shares context with the
        // last, measured in lines rather than bytes for simplicity.
        let overlap_lines = (limits.overlap_size / 40).max(1);
        start = end.saturating_sub(overlap_lines).max(start + 1);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_at_least_one_chunk_for_small_file() {
        let chunks = chunk_windowed("notes.txt", "line one\nline two\n", ChunkingLimits::default());
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn large_file_is_split_into_overlapping_windows() {
        let content = (0..500).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let limits = ChunkingLimits {
            max_chunk_size: 200,
            overlap_size: 40,
        };
        let chunks = chunk_windowed("big.txt", &content, limits);
        assert!(chunks.len() > 1);
    }
}
