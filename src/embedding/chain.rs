//! Ordered fallback across embedding providers, with the last provider that
//! succeeded cached as "active" so steady-state calls skip straight to it
//! instead of re-probing the whole chain — the same sticky-active shape the
//! teacher used `arc_swap::ArcSwap` for around its hot-swappable `Config`.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{EmbeddingProvider, ProviderError};

/// Tries providers in priority order, remembering which one last worked.
pub struct ProviderChain {
    providers: Vec<Arc<dyn EmbeddingProvider>>,
    active_index: ArcSwap<usize>,
}

impl ProviderChain {
    /// `providers` is priority order: index 0 is tried first on a cold
    /// start or after every provider has failed.
    pub fn new(providers: Vec<Arc<dyn EmbeddingProvider>>) -> Self {
        Self {
            providers,
            active_index: ArcSwap::from_pointee(0),
        }
    }

    pub fn dimension(&self) -> Option<usize> {
        self.providers.first().map(|p| p.dimension())
    }

    /// Embed via the sticky-active provider; on failure, fall through the
    /// remaining providers in order (skipping any reporting itself
    /// unavailable) and stick to whichever succeeds. If every provider
    /// fails, returns [`ProviderError::AllProvidersFailed`] carrying each
    /// provider's own error.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if self.providers.is_empty() {
            return Err(ProviderError::NoProviders);
        }
        let start = **self.active_index.load();
        let n = self.providers.len();
        let mut errors = Vec::new();

        for offset in 0..n {
            let idx = (start + offset) % n;
            let provider = &self.providers[idx];
            if !provider.is_available() {
                errors.push((provider.name().to_string(), "not available".to_string()));
                continue;
            }
            match provider.embed_batch(texts).await {
                Ok(vectors) => {
                    if idx != start {
                        self.active_index.store(Arc::new(idx));
                    }
                    return Ok(vectors);
                }
                Err(err) => errors.push((provider.name().to_string(), err.to_string())),
            }
        }
        Err(ProviderError::AllProvidersFailed(errors))
    }

    /// Clear the sticky-active cache; the next call re-probes from index 0.
    pub fn reset_active(&self) {
        self.active_index.store(Arc::new(0));
    }

    /// Health-check every provider, returning `(name, healthy)` pairs in
    /// configured priority order.
    pub async fn check_all(&self) -> Vec<(String, bool)> {
        let mut results = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let healthy = provider.health_check().await;
            results.push((provider.name().to_string(), healthy));
        }
        results
    }

    pub fn active_provider_name(&self) -> Option<String> {
        let idx = **self.active_index.load();
        self.providers.get(idx).map(|p| p.name().to_string())
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for ProviderChain {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        ProviderChain::embed_batch(self, texts).await
    }

    fn dimension(&self) -> usize {
        ProviderChain::dimension(self).unwrap_or(0)
    }

    fn name(&self) -> &str {
        "provider-chain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FlakyProvider {
        name: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            if self.fail {
                Err(ProviderError::NotAvailable(self.name.to_string()))
            } else {
                Ok(texts.iter().map(|_| vec![1.0]).collect())
            }
        }
        fn dimension(&self) -> usize {
            1
        }
        fn name(&self) -> &str {
            self.name
        }
    }

    #[tokio::test]
    async fn falls_through_to_next_provider_on_failure() {
        let chain = ProviderChain::new(vec![
            Arc::new(FlakyProvider { name: "primary", fail: true }),
            Arc::new(FlakyProvider { name: "backup", fail: false }),
        ]);
        let result = chain.embed_batch(&["hello".to_string()]).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn errors_when_every_provider_fails() {
        let chain = ProviderChain::new(vec![Arc::new(FlakyProvider { name: "only", fail: true })]);
        assert!(chain.embed_batch(&["hello".to_string()]).await.is_err());
    }

    #[tokio::test]
    async fn empty_chain_errors_with_no_providers() {
        let chain = ProviderChain::new(Vec::new());
        assert!(matches!(
            chain.embed_batch(&["x".to_string()]).await,
            Err(ProviderError::NoProviders)
        ));
    }

    #[tokio::test]
    async fn all_providers_failing_reports_every_provider() {
        let chain = ProviderChain::new(vec![
            Arc::new(FlakyProvider { name: "primary", fail: true }),
            Arc::new(FlakyProvider { name: "backup", fail: true }),
        ]);
        match chain.embed_batch(&["hello".to_string()]).await {
            Err(ProviderError::AllProvidersFailed(errors)) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].0, "primary");
                assert_eq!(errors[1].0, "backup");
            }
            other => panic!("expected AllProvidersFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn active_provider_sticks_after_first_success_until_reset() {
        let chain = ProviderChain::new(vec![
            Arc::new(FlakyProvider { name: "primary", fail: true }),
            Arc::new(FlakyProvider { name: "backup", fail: false }),
        ]);
        chain.embed_batch(&["hello".to_string()]).await.unwrap();
        assert_eq!(chain.active_provider_name().as_deref(), Some("backup"));
        chain.reset_active();
        assert_eq!(chain.active_provider_name().as_deref(), Some("primary"));
    }
}
