//! Generic tree-sitter-backed extractor shared by every registered grammar.
//!
//! Rather than one hand-rolled recursive descent per language, this walks
//! whatever grammar [`LanguageSpec`] points it at, recognizing declarations
//! purely by node-kind string — the same data-driven shape the teacher used
//! for its chunk-kind classification tables, just keyed by grammar instead
//! of by hand-written regex.

use tree_sitter::{Node, Parser};

use super::languages::LanguageSpec;
use super::signature::{build_breadcrumb, extract_references, extract_signature, leading_doc_comment};
use super::ParseError;
use crate::domain::hashing::file_hash;
use crate::domain::types::{ordered_insert, Chunk, ChunkKind};

pub fn extract(path: &str, content: &str, spec: &LanguageSpec) -> Result<Vec<Chunk>, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&(spec.ts_language)())
        .map_err(|e| ParseError::GrammarFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
    let tree = parser.parse(content, None).ok_or_else(|| ParseError::GrammarFailed {
        path: path.to_string(),
        reason: "parser returned no tree".to_string(),
    })?;

    let whole_file_hash = file_hash(content.as_bytes());
    let mut out = Vec::new();
    let mut breadcrumb = Vec::new();
    walk(
        tree.root_node(),
        content,
        spec,
        &mut breadcrumb,
        &mut out,
        path,
        &whole_file_hash,
    );
    Ok(out)
}

fn walk(
    node: Node,
    source: &str,
    spec: &LanguageSpec,
    breadcrumb: &mut Vec<String>,
    out: &mut Vec<Chunk>,
    path: &str,
    file_hash: &str,
) {
    let kind = node.kind();
    let callable = spec.callable_kinds.iter().find(|(k, _)| *k == kind);
    let type_decl = spec.type_kinds.iter().find(|(k, _)| *k == kind);

    if let Some((_, chunk_kind)) = callable.or(type_decl) {
        let is_type = type_decl.is_some();
        let conformances = if is_type { extract_conformances(node, source, spec) } else { Vec::new() };

        // class/struct/actor/protocol/enum with conformances (and extensions
        // that introduce one) get a lightweight signature-only decl chunk in
        // addition to the full-body chunk; everything else is a single chunk.
        if is_type && !conformances.is_empty() {
            emit_type_decl_chunk(node, source, spec, *chunk_kind, &conformances, breadcrumb, out, path, file_hash);
        }
        if !(chunk_kind == &ChunkKind::Extension && conformances.is_empty()) {
            emit_chunk(node, source, spec, *chunk_kind, &conformances, breadcrumb, out, path, file_hash);
        }

        if is_type {
            let name = declaration_name(node, source);
            if let Some(name) = &name {
                breadcrumb.push(name.clone());
            }
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                walk(child, source, spec, breadcrumb, out, path, file_hash);
            }
            if name.is_some() {
                breadcrumb.pop();
            }
            return;
        }
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk(child, source, spec, breadcrumb, out, path, file_hash);
    }
}

/// Extract the declared conformance/supertype names on a type node, via
/// `spec.conformance_field`. Empty when the language tracks no such field or
/// the node simply doesn't declare any (e.g. a bare `class Foo`).
fn extract_conformances(node: Node, source: &str, spec: &LanguageSpec) -> Vec<String> {
    let Some(field) = spec.conformance_field else {
        return Vec::new();
    };
    let Some(conf_node) = node.child_by_field_name(field) else {
        return Vec::new();
    };
    extract_references(
        source.get(conf_node.start_byte()..conf_node.end_byte()).unwrap_or(""),
        None,
        16,
    )
}

/// The lightweight half of a type declaration's two-chunk emission: signature
/// only, `is_type_declaration = true`, conformance names folded into
/// `symbols` alongside the declared name.
#[allow(clippy::too_many_arguments)]
fn emit_type_decl_chunk(
    node: Node,
    source: &str,
    spec: &LanguageSpec,
    chunk_kind: ChunkKind,
    conformances: &[String],
    breadcrumb: &[String],
    out: &mut Vec<Chunk>,
    path: &str,
    file_hash: &str,
) {
    let Some(signature) = extract_signature(node, source) else {
        return;
    };
    let start_line = node.start_position().row as u32 + 1;
    let name = declaration_name(node, source);

    let mut chunk = Chunk::new(
        path.to_string(),
        start_line,
        start_line,
        chunk_kind,
        signature,
        spec.language_name.to_string(),
    )
    .with_file_hash(file_hash.to_string());

    if let Some(name) = &name {
        ordered_insert(&mut chunk.symbols, name.clone());
    }
    for conformance in conformances {
        ordered_insert(&mut chunk.symbols, conformance.clone());
        ordered_insert(&mut chunk.conformances, conformance.clone());
    }
    chunk.doc_comment = leading_doc_comment(node, source, spec.comment_kinds);
    chunk.signature = Some(chunk.content.clone());
    chunk.breadcrumb = build_breadcrumb(breadcrumb);
    chunk.is_type_declaration = true;
    out.push(chunk);
}

/// The full-body chunk: every callable, and every type declaration (whole
/// node text, `is_type_declaration = false`). Conformance names, when given,
/// still populate `chunk.conformances` for lookup even when no sibling decl
/// chunk was emitted.
#[allow(clippy::too_many_arguments)]
fn emit_chunk(
    node: Node,
    source: &str,
    spec: &LanguageSpec,
    chunk_kind: ChunkKind,
    conformances: &[String],
    breadcrumb: &[String],
    out: &mut Vec<Chunk>,
    path: &str,
    file_hash: &str,
) {
    let Some(text) = source.get(node.start_byte()..node.end_byte()) else {
        return;
    };
    let start_line = node.start_position().row as u32 + 1;
    let end_line = node.end_position().row as u32 + 1;
    let name = declaration_name(node, source);

    let mut chunk = Chunk::new(
        path.to_string(),
        start_line,
        end_line,
        chunk_kind,
        text.to_string(),
        spec.language_name.to_string(),
    )
    .with_file_hash(file_hash.to_string());

    if let Some(name) = &name {
        ordered_insert(&mut chunk.symbols, name.clone());
    }
    chunk.doc_comment = leading_doc_comment(node, source, spec.comment_kinds);
    chunk.signature = extract_signature(node, source);
    chunk.breadcrumb = build_breadcrumb(breadcrumb);
    for reference in extract_references(text, name.as_deref(), 32) {
        ordered_insert(&mut chunk.references, reference);
    }
    chunk.is_type_declaration = false;
    for conformance in conformances {
        ordered_insert(&mut chunk.conformances, conformance.clone());
    }
    out.push(chunk);
}

fn declaration_name(node: Node, source: &str) -> Option<String> {
    let name_node = node
        .child_by_field_name("name")
        .or_else(|| node.child_by_field_name("declarator"))?;
    source
        .get(name_node.start_byte()..name_node.end_byte())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::languages;

    #[test]
    fn class_with_superclass_emits_decl_and_full_chunks() {
        let spec = languages::lookup("py").unwrap();
        let src = "class Dog(Animal):\n    def bark(self):\n        return \"woof\"\n";
        let chunks = extract("animals.py", src, spec).unwrap();

        let decls: Vec<_> = chunks.iter().filter(|c| c.is_type_declaration).collect();
        assert_eq!(decls.len(), 1, "expected exactly one decl chunk, got {decls:?}");
        let decl = decls[0];
        assert!(!decl.content.contains("woof"), "decl chunk must be signature-only: {}", decl.content);
        assert!(decl.symbols.contains(&"Dog".to_string()));
        assert!(decl.symbols.contains(&"Animal".to_string()));
        assert!(decl.conformances.contains(&"Animal".to_string()));

        let full = chunks
            .iter()
            .find(|c| !c.is_type_declaration && c.kind == ChunkKind::Class)
            .expect("full class chunk");
        assert!(full.content.contains("woof"));
        assert!(full.conformances.contains(&"Animal".to_string()));
    }

    #[test]
    fn class_without_superclass_emits_only_the_full_chunk() {
        let spec = languages::lookup("py").unwrap();
        let src = "class Standalone:\n    def noop(self):\n        pass\n";
        let chunks = extract("standalone.py", src, spec).unwrap();

        assert!(chunks.iter().all(|c| !c.is_type_declaration || c.kind != ChunkKind::Class));
        let class_chunks: Vec<_> = chunks.iter().filter(|c| c.kind == ChunkKind::Class).collect();
        assert_eq!(class_chunks.len(), 1);
        assert!(!class_chunks[0].is_type_declaration);
    }

    #[test]
    fn rust_impl_block_has_no_conformance_field_and_emits_single_chunk() {
        let spec = languages::lookup("rs").unwrap();
        let src = "impl Widget for Button {\n    fn render(&self) {}\n}\n";
        let chunks = extract("button.rs", src, spec).unwrap();
        let extensions: Vec<_> = chunks.iter().filter(|c| c.kind == ChunkKind::Extension).collect();
        assert_eq!(extensions.len(), 1);
        assert!(!extensions[0].is_type_declaration);
    }
}
