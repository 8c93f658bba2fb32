//! Shared text-extraction helpers used by every tree-sitter-backed language
//! processor: signature text, leading doc comments, and identifier
//! references. Kept as plain functions over `&str`/byte ranges rather than
//! tied to any one grammar, so the same helpers serve rust/python/c-family
//! alike.

use std::collections::HashSet;
use tree_sitter::Node;

/// Text up to (but excluding) a node's `body` field, collapsed to one line.
/// For declarations with no `body` field (e.g. a C prototype) this is the
/// whole node text.
pub fn extract_signature(node: Node, source: &str) -> Option<String> {
    let sig_end = node
        .child_by_field_name("body")
        .map(|b| b.start_byte())
        .unwrap_or(node.end_byte());
    if sig_end <= node.start_byte() {
        return None;
    }
    let text = source.get(node.start_byte()..sig_end)?.trim_end();
    if text.is_empty() {
        return None;
    }
    Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Concatenate contiguous leading comment siblings (closest to the node,
/// walking outward) into a single doc comment string, stripping the most
/// common comment markers. Returns `None` if there is no leading comment.
pub fn leading_doc_comment(node: Node, source: &str, comment_kinds: &[&str]) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = node.prev_sibling();
    while let Some(sibling) = current {
        if !comment_kinds.contains(&sibling.kind()) {
            break;
        }
        // Only attach comments that sit on the lines directly above, not ones
        // separated by a blank line from the declaration.
        let text = source
            .get(sibling.start_byte()..sibling.end_byte())
            .unwrap_or("")
            .trim();
        lines.push(strip_comment_markers(text));
        current = sibling.prev_sibling();
    }
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}

fn strip_comment_markers(text: &str) -> String {
    let trimmed = text
        .trim_start_matches("///")
        .trim_start_matches("//!")
        .trim_start_matches("//")
        .trim_start_matches("/**")
        .trim_start_matches("/*!")
        .trim_start_matches("/*")
        .trim_end_matches("*/")
        .trim_start_matches('#')
        .trim();
    trimmed
        .lines()
        .map(|l| l.trim().trim_start_matches('*').trim())
        .collect::<Vec<_>>()
        .join("\n")
}

const KEYWORDS: &[&str] = &[
    "fn", "pub", "if", "else", "for", "while", "return", "let", "mut", "struct", "enum", "impl",
    "trait", "use", "mod", "const", "static", "self", "Self", "def", "class", "import", "from",
    "function", "var", "async", "await", "public", "private", "protected", "static", "void",
    "int", "string", "bool", "true", "false", "null", "nil", "none", "func", "package", "type",
    "interface", "extends", "implements", "new", "this", "super", "try", "catch", "throw",
    "throws", "override", "final", "abstract", "namespace", "using", "where", "in", "is", "as",
];

/// Extract a capped, ordered, deduplicated list of identifier-like tokens
/// referenced in `text`, excluding language keywords and `exclude_name`
/// (typically the declaration's own name).
pub fn extract_references(text: &str, exclude_name: Option<&str>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut token = String::new();
    let mut push_token = |token: &mut String, out: &mut Vec<String>, seen: &mut HashSet<String>| {
        if token.len() > 1
            && !token.chars().next().unwrap().is_ascii_digit()
            && !KEYWORDS.contains(&token.as_str())
            && Some(token.as_str()) != exclude_name
            && seen.insert(token.clone())
        {
            out.push(token.clone());
        }
        token.clear();
    };
    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            token.push(ch);
        } else {
            push_token(&mut token, &mut out, &mut seen);
        }
        if out.len() >= cap {
            return out;
        }
    }
    push_token(&mut token, &mut out, &mut seen);
    out
}

/// Join a stack of enclosing type/module names into `"Outer > Inner > leaf"`.
pub fn build_breadcrumb(stack: &[String]) -> Option<String> {
    if stack.is_empty() {
        None
    } else {
        Some(stack.join(" > "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_triple_slash_markers() {
        assert_eq!(strip_comment_markers("/// hello"), "hello");
    }

    #[test]
    fn extract_references_excludes_keywords_and_self_name() {
        let refs = extract_references("pub fn authenticate(user: &str) -> bool { validate(user) }", Some("authenticate"), 10);
        assert!(refs.contains(&"validate".to_string()));
        assert!(refs.contains(&"user".to_string()));
        assert!(!refs.contains(&"authenticate".to_string()));
        assert!(!refs.contains(&"fn".to_string()));
    }

    #[test]
    fn build_breadcrumb_joins_with_arrows() {
        assert_eq!(
            build_breadcrumb(&["Outer".to_string(), "Inner".to_string()]),
            Some("Outer > Inner".to_string())
        );
        assert_eq!(build_breadcrumb(&[]), None);
    }
}
