//! Local embedding provider backed by `fastembed`'s bundled ONNX models —
//! no network calls, no external service to configure.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::embedding::{EmbeddingProvider, ProviderError};

/// `BGESmallENV15` is a 384-dimension sentence embedding model small enough
/// to run comfortably on a developer machine without a GPU.
const DIMENSION: usize = 384;

pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedProvider {
    pub fn try_new() -> Result<Self, ProviderError> {
        let options = InitOptions::new(EmbeddingModel::BGESmallENV15).with_show_download_progress(false);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| ProviderError::NotAvailable(format!("fastembed init failed: {e}")))?;
        Ok(Self { model: Arc::new(Mutex::new(model)) })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let model = self.model.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut guard = model.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.embed(texts, None)
        })
        .await
        .map_err(|e| ProviderError::Unknown(format!("fastembed task panicked: {e}")))?
        .map_err(|e| ProviderError::BatchFailed {
            provider: "fastembed".to_string(),
            reason: e.to_string(),
        })
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn name(&self) -> &str {
        "fastembed"
    }
}
