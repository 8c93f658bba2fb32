//! Concrete [`super::EmbeddingProvider`] implementations.

mod fastembed_provider;
mod null;

pub use fastembed_provider::FastEmbedProvider;
pub use null::NullEmbeddingProvider;
