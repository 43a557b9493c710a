//! Embedding model abstraction used by the batch job and the query path.

use anyhow::Result;

pub mod openai;

pub use openai::OpenAiEmbedder;

/// Maps text to fixed-dimension vectors.
///
/// Implementations are constructed once at process start and injected into
/// the batch job / search service, so tests can substitute a stub. The model
/// dimension is fixed for the lifetime of the implementation.
pub trait TextEmbedder {
    /// Embeds a batch of texts, returning one vector per input in order.
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embeds a single text (the query case).
    fn embed_one(&self, input: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[input])?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for a single input"))
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use super::TextEmbedder;
    use anyhow::Result;

    /// Deterministic embedder for tests: hashes each text into a unit-ish
    /// vector of the configured dimension.
    pub struct StubEmbedder {
        pub dimension: usize,
        pub fail: bool,
    }

    impl StubEmbedder {
        pub fn new(dimension: usize) -> Self {
            Self {
                dimension,
                fail: false,
            }
        }

        pub fn failing(dimension: usize) -> Self {
            Self {
                dimension,
                fail: true,
            }
        }
    }

    impl TextEmbedder for StubEmbedder {
        fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
            if self.fail {
                anyhow::bail!("stub embedder configured to fail");
            }
            Ok(inputs
                .iter()
                .map(|text| {
                    (0..self.dimension)
                        .map(|i| {
                            let seed = text
                                .bytes()
                                .fold(i as u32 + 1, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
                            (seed % 1000) as f32 / 1000.0
                        })
                        .collect()
                })
                .collect())
        }
    }
}
