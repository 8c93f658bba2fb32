//! Deterministic stand-in provider for tests and for BM25-only deployments
//! that never call an embedding backend.

use async_trait::async_trait;

use crate::embedding::{EmbeddingProvider, ProviderError};

/// Returns a fixed-dimension zero vector for every input. Never fails.
pub struct NullEmbeddingProvider {
    dimension: usize,
}

impl NullEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for NullEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|_| vec![0.0; self.dimension]).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn produces_one_vector_per_input_text() {
        let provider = NullEmbeddingProvider::new(8);
        let vectors = provider.embed_batch(&["a".to_string(), "b".to_string()]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 8);
    }
}
