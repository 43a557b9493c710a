//! Cosine-similarity ranking over the in-memory article index.

use anyhow::Result;

use crate::article::SearchHit;
use crate::store::ArticleIndex;

/// Cosine similarity between two vectors of equal length.
///
/// A zero-norm vector on either side scores 0.0 rather than dividing by
/// zero; degenerate inputs sink to the bottom instead of poisoning the sort
/// with NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Scores every article against `query`, returning the best `top_k` hits in
/// descending score order with embeddings stripped.
///
/// An empty index yields an empty vec. Ties keep load order (the sort is
/// stable). A `top_k` beyond the candidate count returns everything.
pub fn rank(query: &[f32], index: &ArticleIndex, top_k: usize) -> Result<Vec<SearchHit>> {
    if index.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(dimension) = index.dimension() {
        anyhow::ensure!(
            query.len() == dimension,
            "query embedding has dimension {}, index has {}",
            query.len(),
            dimension
        );
    }

    let mut scored: Vec<(f32, usize)> = index
        .articles()
        .iter()
        .enumerate()
        .map(|(position, article)| (cosine_similarity(query, &article.embedding), position))
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);

    Ok(scored
        .into_iter()
        .map(|(score, position)| index.articles()[position].record.to_hit(score))
        .collect())
}
