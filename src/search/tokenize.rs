//! Query tokenization and CamelCase-identifier detection, shared by the FTS
//! query builder and the exact-match boost pass.

/// Split a query on whitespace, preserving case and order. No stemming, no
/// stopword removal — the FTS side handles prefix matching on its own.
pub fn tokenize(query: &str) -> Vec<String> {
    query.split_whitespace().map(|s| s.to_string()).collect()
}

/// A term looks like a CamelCase/mixedCase identifier: at least 3 characters,
/// starts with an ASCII letter, contains both an uppercase and a lowercase
/// letter, and (by construction of [`tokenize`]) has no internal whitespace.
pub fn is_camel_case_identifier(term: &str) -> bool {
    if term.len() < 3 {
        return false;
    }
    let Some(first) = term.chars().next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    let has_upper = term.chars().any(|c| c.is_uppercase());
    let has_lower = term.chars().any(|c| c.is_lowercase());
    has_upper && has_lower
}

/// Build an FTS5 MATCH expression per the "prepared FTS query" convention:
/// every token is quoted, and non-CamelCase tokens additionally get a
/// trailing `*` for prefix matching (`"t"*`), while CamelCase terms are
/// quoted exact (`"t"`) since FTS5 tokenizes them as single tokens and a
/// prefix match would blur the case-sensitive identifier. A prepared query
/// must be passed through to [`crate::store::ChunkStore::search_bm25`]
/// without further sanitisation.
pub fn prepare_fts_query(tokens: &[String]) -> String {
    tokens
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| {
            let escaped = t.replace('"', "\"\"");
            if is_camel_case_identifier(t) {
                format!("\"{escaped}\"")
            } else {
                format!("\"{escaped}\"*")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_on_whitespace() {
        assert_eq!(tokenize("find authenticate user"), vec!["find", "authenticate", "user"]);
    }

    #[test]
    fn detects_camel_case_identifiers() {
        assert!(is_camel_case_identifier("authenticateUser"));
        assert!(is_camel_case_identifier("HybridSearch"));
        assert!(!is_camel_case_identifier("auth"));
        assert!(!is_camel_case_identifier("ID"));
        assert!(!is_camel_case_identifier("a1"));
    }

    #[test]
    fn builds_mixed_phrase_and_prefix_query() {
        let tokens = tokenize("HybridSearch engine");
        assert_eq!(prepare_fts_query(&tokens), "\"HybridSearch\" \"engine\"*");
    }
}
