//! Shared, process-wide state the RPC dispatcher's tool handlers close
//! over. Per spec.md §9, the task manager and tool registry are the only
//! sanctioned global state, constructed once at server startup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::chunking::ChunkingLimits;
use crate::config::McbConfig;
use crate::domain::Result;
use crate::embedding::{BatcherConfig, EmbeddingBatcher, EmbeddingProvider, NullEmbeddingProvider, ProviderChain};
use crate::index::IndexManager;
use crate::search::HybridSearch;
use crate::store::{ChunkStore, VectorStore};
use crate::tasks::TaskManager;

/// Bookkeeping for the `watch_codebase` stub: which paths a caller has
/// asked to watch. No filesystem watcher actually runs — `notify` is an
/// out-of-scope collaborator per spec.md §1 — so this only tracks intent.
pub struct WatchRegistry {
    watched: DashMap<String, bool>,
}

impl Default for WatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self { watched: DashMap::new() }
    }

    pub fn start(&self, path: &str) {
        self.watched.insert(path.to_string(), true);
    }

    pub fn stop(&self, path: &str) -> bool {
        self.watched.remove(path).is_some()
    }

    pub fn is_watched(&self, path: &str) -> bool {
        self.watched.get(path).is_some()
    }
}

pub struct AppState {
    pub index: Mutex<IndexManager>,
    pub search: HybridSearch,
    pub provider: Arc<dyn EmbeddingProvider>,
    pub batcher: EmbeddingBatcher,
    pub tasks: Arc<TaskManager>,
    pub watches: WatchRegistry,
    pub config: McbConfig,
    pub limits: ChunkingLimits,
}

impl AppState {
    pub async fn open(config: McbConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let chunk_store = ChunkStore::open(&crate::index::chunks_db_path(&config.data_dir)).await?;
        let vector_store =
            VectorStore::load_or_new(&crate::index::vectors_path(&config.data_dir), config.embedding_dimension)
                .map_err(|e| crate::domain::Error::internal(e.to_string()))?;
        let index = IndexManager::new(chunk_store, vector_store);

        let provider: Arc<dyn EmbeddingProvider> = match crate::embedding::FastEmbedProvider::try_new() {
            Ok(fastembed) => Arc::new(ProviderChain::new(vec![
                Arc::new(fastembed),
                Arc::new(NullEmbeddingProvider::new(config.embedding_dimension)),
            ])),
            Err(_) => Arc::new(NullEmbeddingProvider::new(config.embedding_dimension)),
        };

        let batcher = EmbeddingBatcher::new(
            provider.clone(),
            BatcherConfig {
                max_batch_size: config.batch_size,
                flush_interval: Duration::from_millis(config.batch_timeout_ms),
                memory_budget_bytes: config.batch_memory_limit_bytes,
            },
        );

        let limits = ChunkingLimits { max_chunk_size: config.max_chunk_size, overlap_size: config.overlap_size };

        Ok(Self {
            index: Mutex::new(index),
            search: HybridSearch::new(provider.clone()),
            provider,
            batcher,
            tasks: Arc::new(TaskManager::new()),
            watches: WatchRegistry::new(),
            config,
            limits,
        })
    }

    /// In-process state for tests: no disk, a deterministic provider.
    pub async fn in_memory(dimension: usize) -> Self {
        let index = IndexManager::new(ChunkStore::open_in_memory().await.unwrap(), VectorStore::new(dimension));
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(NullEmbeddingProvider::new(dimension));
        let batcher = EmbeddingBatcher::new(provider.clone(), BatcherConfig::default());
        Self {
            index: Mutex::new(index),
            search: HybridSearch::new(provider.clone()),
            provider,
            batcher,
            tasks: Arc::new(TaskManager::new()),
            watches: WatchRegistry::new(),
            config: McbConfig::load_embedded_defaults_only().expect("embedded defaults always parse"),
            limits: ChunkingLimits::default(),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.config.data_dir.clone()
    }
}
