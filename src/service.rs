//! Query orchestration shared by the console and HTTP entry points.

use anyhow::{Context, Result};

use crate::article::SearchHit;
use crate::embedder::TextEmbedder;
use crate::ranker::rank;
use crate::store::ArticleIndex;

/// Result count used when the caller does not ask for one.
pub const DEFAULT_TOP_K: usize = 10;

/// Text embedded once at startup to learn the configured model's dimension.
const DIMENSION_PROBE: &str = "semsearch dimension probe";

/// Long-lived search pipeline: one embedder, one read-only index.
///
/// Construction verifies that the configured model produces vectors of the
/// same dimension as the persisted index; a mismatch would make every
/// similarity score meaningless, so it aborts startup instead. `search`
/// takes `&self` and mutates nothing, so one service can serve concurrent
/// callers.
pub struct SearchService<E> {
    embedder: E,
    index: ArticleIndex,
}

impl<E: TextEmbedder> SearchService<E> {
    /// Builds the service, probing the model dimension against the index.
    pub fn new(embedder: E, index: ArticleIndex) -> Result<Self> {
        if let Some(dimension) = index.dimension() {
            let probe = embedder
                .embed_one(DIMENSION_PROBE)
                .context("embedding model unavailable at startup")?;
            anyhow::ensure!(
                probe.len() == dimension,
                "configured model produces {}-dimensional vectors but the loaded \
                 index holds {}-dimensional embeddings; re-run the batch embedder \
                 with the current model",
                probe.len(),
                dimension
            );
        }
        Ok(Self { embedder, index })
    }

    /// The loaded candidate set.
    pub fn index(&self) -> &ArticleIndex {
        &self.index
    }

    /// Embeds a query string without ranking.
    ///
    /// The HTTP entry point uses this to cache query embeddings across
    /// requests; most callers want [`search`](Self::search).
    pub fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embedder
            .embed_one(query)
            .context("failed to embed query")
    }

    /// Embeds `query` and returns the `top_k` most similar articles.
    ///
    /// An empty candidate set short-circuits to an empty result without
    /// touching the model.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.embed_query(query)?;
        rank(&vector, &self.index, top_k.max(1))
    }
}
