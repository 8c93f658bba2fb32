//! Grammar-based chunking for JSON and YAML: one [`Chunk`] per top-level
//! key, so a large config file indexes as separate searchable units instead
//! of one opaque blob.

use tree_sitter::Parser;

use super::languages::{json_spec, yaml_spec};
use crate::domain::hashing::file_hash;
use crate::domain::types::{ordered_insert, Chunk, ChunkKind};

pub fn extract_json(path: &str, content: &str) -> Vec<Chunk> {
    let (language_fn, language_name) = json_spec();
    extract_top_level(path, content, language_fn, language_name, "pair", "key")
}

pub fn extract_yaml(path: &str, content: &str) -> Vec<Chunk> {
    let (language_fn, language_name) = yaml_spec();
    extract_top_level(path, content, language_fn, language_name, "block_mapping_pair", "key")
}

fn extract_top_level(
    path: &str,
    content: &str,
    language_fn: fn() -> tree_sitter::Language,
    language_name: &str,
    entry_kind: &str,
    key_field: &str,
) -> Vec<Chunk> {
    let mut parser = Parser::new();
    if parser.set_language(&language_fn()).is_err() {
        return Vec::new();
    }
    let Some(tree) = parser.parse(content, None) else {
        return Vec::new();
    };
    let whole_file_hash = file_hash(content.as_bytes());

    // The document root for JSON is `document -> object/array`; for YAML it
    // is `stream -> document -> block_mapping`. Either way the entries we
    // want live one level below the first container node.
    let mut root = tree.root_node();
    let mut cursor = root.walk();
    while root.named_child_count() == 1 {
        let Some(only_child) = root.named_child(0) else { break };
        root = only_child;
        cursor = root.walk();
    }

    let mut chunks = Vec::new();
    for entry in root.named_children(&mut cursor) {
        if entry.kind() != entry_kind {
            continue;
        }
        let Some(text) = content.get(entry.start_byte()..entry.end_byte()) else {
            continue;
        };
        let key = entry
            .child_by_field_name(key_field)
            .and_then(|k| content.get(k.start_byte()..k.end_byte()))
            .map(|s| s.trim_matches(|c| c == '"' || c == '\'').to_string());

        let mut chunk = Chunk::new(
            path.to_string(),
            entry.start_position().row as u32 + 1,
            entry.end_position().row as u32 + 1,
            ChunkKind::Document,
            text.to_string(),
            language_name.to_string(),
        )
        .with_file_hash(whole_file_hash.clone());
        if let Some(key) = key {
            ordered_insert(&mut chunk.symbols, key);
        }
        chunks.push(chunk);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_splits_top_level_keys() {
        let src = r#"{"a": 1, "b": {"c": 2}}"#;
        let chunks = extract_json("config.json", src);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].symbols, vec!["a".to_string()]);
        assert_eq!(chunks[1].symbols, vec!["b".to_string()]);
    }
}
