//! CamelCase-aware exact-match boosting and partial-match demotion.
//!
//! Lexical search alone over-weights accidental substring overlaps (e.g. a
//! query for `USearchError` surfacing `BM25Search` purely because `Search`
//! tokenizes out of both). This pass re-ranks candidates by how literally
//! the query's CamelCase terms appear in the chunk.

use crate::domain::types::Chunk;

const EXACT_SYMBOL_BOOST: f32 = 2.5;
const SUBSTRING_BOOST: f32 = 2.0;
const NO_MATCH_DEMOTION: f32 = 0.3;
const NEUTRAL: f32 = 1.0;

/// Multiplier to apply to a candidate's fused score, given the query's
/// CamelCase terms (already filtered via [`super::tokenize::is_camel_case_identifier`]).
///
/// - Any term an exact match (case-sensitive) against one of `chunk.symbols`: 2.5x.
/// - Else any term a substring of `chunk.content` or of one of `chunk.references`: 2.0x.
/// - Else, if the query had CamelCase terms at all but none matched either
///   way, the candidate only surfaced via looser lexical/prefix matching —
///   demote it: 0.3x.
/// - If the query has no CamelCase terms, boosting doesn't apply: 1.0x.
pub fn camel_case_multiplier(camel_terms: &[&str], chunk: &Chunk) -> f32 {
    if camel_terms.is_empty() {
        return NEUTRAL;
    }

    let exact = camel_terms.iter().any(|term| chunk.symbols.iter().any(|s| s == term));
    if exact {
        return EXACT_SYMBOL_BOOST;
    }

    let substring = camel_terms
        .iter()
        .any(|term| chunk.content.contains(term) || chunk.references.iter().any(|r| r.contains(term)));
    if substring {
        return SUBSTRING_BOOST;
    }

    NO_MATCH_DEMOTION
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ChunkKind;

    fn chunk() -> Chunk {
        let mut c = Chunk::new(
            "a.rs".to_string(),
            1,
            5,
            ChunkKind::Function,
            "fn helper() { BM25Search::run(); }".to_string(),
            "rust".to_string(),
        );
        c.symbols = vec!["helper".to_string()];
        c.references = vec!["BM25Search".to_string()];
        c
    }

    #[test]
    fn exact_symbol_match_gets_highest_boost() {
        let mut c = chunk();
        c.symbols = vec!["authenticateUser".to_string()];
        assert_eq!(camel_case_multiplier(&["authenticateUser"], &c), EXACT_SYMBOL_BOOST);
    }

    #[test]
    fn substring_in_content_gets_medium_boost() {
        assert_eq!(camel_case_multiplier(&["BM25Search"], &chunk()), SUBSTRING_BOOST);
    }

    #[test]
    fn no_real_containment_is_demoted() {
        // "USearchError" shares the substring "Search" with "BM25Search" but
        // neither literally contains the other.
        assert_eq!(camel_case_multiplier(&["USearchError"], &chunk()), NO_MATCH_DEMOTION);
    }

    #[test]
    fn non_camel_query_is_neutral() {
        assert_eq!(camel_case_multiplier(&[], &chunk()), NEUTRAL);
    }
}
