//! Reciprocal Rank Fusion of the lexical (BM25) and semantic (ANN) result
//! lanes into a single ranked candidate list.

use std::collections::HashMap;

/// One candidate's standing in each lane before fusion.
#[derive(Debug, Clone, Default)]
pub struct FusedCandidate {
    pub bm25_score: f32,
    pub bm25_rank: Option<usize>,
    pub semantic_score: f32,
    pub semantic_rank: Option<usize>,
    pub rrf_score: f32,
}

/// Fuse two rank-ordered lanes (best first) into per-id scores via
/// `score(id) = (1 - w) / (k + rank_lex) + w / (k + rank_sem)`, where rank is
/// 1-based and a lane that never saw `id` contributes 0 to its half of the
/// sum. Returns candidates in descending `rrf_score` order.
pub fn fuse_rrf(
    lexical: &[(String, f32)],
    semantic: &[(String, f32)],
    semantic_weight: f32,
    k: f32,
) -> Vec<(String, FusedCandidate)> {
    let mut candidates: HashMap<String, FusedCandidate> = HashMap::new();

    for (rank, (id, score)) in lexical.iter().enumerate() {
        let entry = candidates.entry(id.clone()).or_default();
        entry.bm25_score = *score;
        entry.bm25_rank = Some(rank + 1);
    }
    for (rank, (id, score)) in semantic.iter().enumerate() {
        let entry = candidates.entry(id.clone()).or_default();
        entry.semantic_score = *score;
        entry.semantic_rank = Some(rank + 1);
    }

    let lex_weight = 1.0 - semantic_weight;
    for candidate in candidates.values_mut() {
        let lex_term = candidate.bm25_rank.map_or(0.0, |r| lex_weight / (k + r as f32));
        let sem_term = candidate.semantic_rank.map_or(0.0, |r| semantic_weight / (k + r as f32));
        candidate.rrf_score = lex_term + sem_term;
    }

    let mut fused: Vec<(String, FusedCandidate)> = candidates.into_iter().collect();
    fused.sort_by(|a, b| {
        b.1.rrf_score
            .partial_cmp(&a.1.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_present_in_both_lanes_outranks_single_lane_hits() {
        let lexical = vec![("a".to_string(), 5.0), ("b".to_string(), 4.0)];
        let semantic = vec![("a".to_string(), 0.9), ("c".to_string(), 0.8)];
        let fused = fuse_rrf(&lexical, &semantic, 0.5, 60.0);
        assert_eq!(fused[0].0, "a");
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn semantic_weight_zero_ignores_semantic_lane() {
        let lexical = vec![("a".to_string(), 5.0)];
        let semantic = vec![("b".to_string(), 0.99)];
        let fused = fuse_rrf(&lexical, &semantic, 0.0, 60.0);
        assert_eq!(fused[0].0, "a");
        assert_eq!(fused[0].1.rrf_score, 0.0.max(1.0 / 61.0));
    }
}
