//! Embedding generation: the [`EmbeddingProvider`] trait every backend
//! implements, the size/timeout/memory-coalescing [`EmbeddingBatcher`], and
//! the ordered-fallback [`ProviderChain`].

mod batcher;
mod chain;
mod providers;

pub use batcher::{BatcherConfig, BatcherError, EmbeddingBatcher};
pub use chain::ProviderChain;
pub use providers::{FastEmbedProvider, NullEmbeddingProvider};

use async_trait::async_trait;
use thiserror::Error;

/// Errors a single embedding backend can raise.
#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("provider '{0}' is not available")]
    NotAvailable(String),

    #[error("provider '{provider}' has no model named '{model}'")]
    ModelNotFound { provider: String, model: String },

    #[error("provider '{provider}' timed out after {seconds}s")]
    Timeout { provider: String, seconds: u64 },

    #[error("provider '{provider}' rate limited the request")]
    RateLimited {
        provider: String,
        retry_after: Option<u64>,
    },

    #[error("provider '{provider}' rejected the batch: {reason}")]
    BatchFailed { provider: String, reason: String },

    #[error("no embedding providers are configured")]
    NoProviders,

    #[error("{0}")]
    Unknown(String),

    #[error("all providers failed: {0:?}")]
    AllProvidersFailed(Vec<(String, String)>),
}

/// A backend that turns text into fixed-dimension vectors.
///
/// Every provider must report a constant [`EmbeddingProvider::dimension`] —
/// [`crate::store::VectorStore`] is built against one dimension for its
/// whole lifetime, so providers cannot change size mid-stream.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
    fn dimension(&self) -> usize;
    fn name(&self) -> &str;

    /// Cheap, synchronous reachability check consulted by [`ProviderChain`]
    /// before it spends a round-trip on a provider it already knows is down.
    /// Defaults to always-available; backends with a cheaper liveness signal
    /// (a cached auth failure, a missing local model file) should override it.
    fn is_available(&self) -> bool {
        true
    }

    /// Health probe used by [`ProviderChain::check_all`]; default
    /// implementation embeds a one-word probe string.
    async fn health_check(&self) -> bool {
        self.embed_batch(&["health check".to_string()]).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_carries_the_numeric_timeout() {
        let err = ProviderError::Timeout { provider: "fastembed".to_string(), seconds: 30 };
        assert!(err.to_string().contains("30"));
        assert!(matches!(err, ProviderError::Timeout { seconds: 30, .. }));
    }

    #[test]
    fn rate_limited_retry_after_is_optional() {
        let with_hint = ProviderError::RateLimited { provider: "openai".to_string(), retry_after: Some(5) };
        let without_hint = ProviderError::RateLimited { provider: "openai".to_string(), retry_after: None };
        assert!(matches!(with_hint, ProviderError::RateLimited { retry_after: Some(5), .. }));
        assert!(matches!(without_hint, ProviderError::RateLimited { retry_after: None, .. }));
    }
}
