//! Coalescing batcher: individual `embed()` calls queue up and are flushed
//! to the underlying provider together, trading a small amount of latency
//! for far fewer provider round-trips.
//!
//! Grounded on the teacher's single-owner actor shape (a background task
//! draining an `mpsc` channel, callers correlated via `oneshot` replies) —
//! the same structure the teacher used for its hybrid-search actor, here
//! driving a flush loop instead of a query loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use super::{EmbeddingProvider, ProviderError};

#[derive(Debug, Error, Clone)]
pub enum BatcherError {
    #[error(transparent)]
    Upstream(#[from] ProviderError),

    #[error("the embedding batcher has shut down")]
    Shutdown,
}

enum Command {
    Embed(Request),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

struct Request {
    text: String,
    reply: oneshot::Sender<Result<Vec<f32>, BatcherError>>,
}

/// Tunables controlling when a pending batch is flushed.
#[derive(Debug, Clone, Copy)]
pub struct BatcherConfig {
    pub max_batch_size: usize,
    pub flush_interval: Duration,
    /// Flush once the pending batch's total text byte length reaches this.
    pub memory_budget_bytes: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 32,
            flush_interval: Duration::from_millis(50),
            memory_budget_bytes: 1_000_000,
        }
    }
}

/// Queues `embed()` calls and flushes them to `provider` in batches.
///
/// Cloning an [`EmbeddingBatcher`] is cheap — every clone shares the same
/// background flush task via the underlying `mpsc::Sender`.
#[derive(Clone)]
pub struct EmbeddingBatcher {
    sender: mpsc::Sender<Command>,
    /// Shared across every clone so `shutdown()` is visible to all handles,
    /// not just the clone it was called on.
    shut_down: Arc<AtomicBool>,
}

impl EmbeddingBatcher {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: BatcherConfig) -> Self {
        let (sender, receiver) = mpsc::channel(1024);
        tokio::spawn(run_flush_loop(provider, config, receiver));
        Self { sender, shut_down: Arc::new(AtomicBool::new(false)) }
    }

    /// Queue `text` for embedding, returning once this request's batch has
    /// been flushed. Requests queued earlier are always flushed no later
    /// than requests queued after them (FIFO per caller).
    pub async fn embed(&self, text: String) -> Result<Vec<f32>, BatcherError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(BatcherError::Shutdown);
        }
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(Command::Embed(Request { text, reply }))
            .await
            .map_err(|_| BatcherError::Shutdown)?;
        rx.await.map_err(|_| BatcherError::Shutdown)?
    }

    /// Queue every text in `texts` for embedding and return vectors in the
    /// same order, regardless of how the underlying batches happen to split.
    /// An empty input short-circuits without contacting the provider.
    pub async fn embed_many(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, BatcherError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let requests = texts.into_iter().map(|text| self.embed(text));
        futures::future::try_join_all(requests).await
    }

    /// Drain the queue synchronously: block until every request pending at
    /// the moment this is called has been flushed to the provider.
    pub async fn flush(&self) -> Result<(), BatcherError> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(Command::Flush(tx)).await.map_err(|_| BatcherError::Shutdown)?;
        rx.await.map_err(|_| BatcherError::Shutdown)
    }

    /// Stop accepting new work and fail every request still queued — on this
    /// handle or any of its clones — with a terminal [`BatcherError::Shutdown`].
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        let _ = self.sender.send(Command::Shutdown).await;
    }
}

async fn run_flush_loop(
    provider: Arc<dyn EmbeddingProvider>,
    config: BatcherConfig,
    mut receiver: mpsc::Receiver<Command>,
) {
    let mut pending: Vec<Request> = Vec::new();
    let mut pending_bytes = 0usize;
    let mut deadline: Option<Instant> = None;

    loop {
        let sleep = match deadline {
            Some(d) => tokio::time::sleep_until(d),
            None => tokio::time::sleep(config.flush_interval),
        };
        tokio::pin!(sleep);

        tokio::select! {
            biased;
            maybe_command = receiver.recv() => {
                match maybe_command {
                    Some(Command::Embed(request)) => {
                        if deadline.is_none() {
                            deadline = Some(Instant::now() + config.flush_interval);
                        }
                        pending_bytes += request.text.len();
                        pending.push(request);
                        if pending.len() >= config.max_batch_size || pending_bytes >= config.memory_budget_bytes {
                            flush(&provider, std::mem::take(&mut pending)).await;
                            pending_bytes = 0;
                            deadline = None;
                        }
                    }
                    Some(Command::Flush(ack)) => {
                        if !pending.is_empty() {
                            flush(&provider, std::mem::take(&mut pending)).await;
                            pending_bytes = 0;
                            deadline = None;
                        }
                        let _ = ack.send(());
                    }
                    Some(Command::Shutdown) | None => {
                        // Fail whatever was pending and exit; any request
                        // already in flight toward the channel will observe
                        // either the closed channel or the shut-down flag.
                        for request in std::mem::take(&mut pending) {
                            let _ = request.reply.send(Err(BatcherError::Shutdown));
                        }
                        return;
                    }
                }
            }
            _ = &mut sleep, if deadline.is_some() => {
                flush(&provider, std::mem::take(&mut pending)).await;
                pending_bytes = 0;
                deadline = None;
            }
        }
    }
}

/// Embed one batch and fan the results (or a single shared error) back out
/// to each caller in the order they were queued.
async fn flush(provider: &Arc<dyn EmbeddingProvider>, batch: Vec<Request>) {
    if batch.is_empty() {
        return;
    }
    let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
    match provider.embed_batch(&texts).await {
        Ok(vectors) => {
            for (request, vector) in batch.into_iter().zip(vectors) {
                let _ = request.reply.send(Ok(vector));
            }
        }
        Err(err) => {
            let batcher_err: BatcherError = err.into();
            for request in batch {
                let _ = request.reply.send(Err(batcher_err.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderError::NotAvailable("counting".into()));
            }
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }
        fn dimension(&self) -> usize {
            1
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn coalesces_concurrent_requests_into_one_provider_call() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0), fail: false });
        let batcher = EmbeddingBatcher::new(
            provider.clone(),
            BatcherConfig { max_batch_size: 8, flush_interval: Duration::from_millis(40), memory_budget_bytes: 1_000_000 },
        );

        let a = batcher.embed("one".to_string());
        let b = batcher.embed("two".to_string());
        let (ra, rb) = tokio::join!(a, b);
        assert!(ra.is_ok());
        assert!(rb.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn batch_size_trigger_flushes_before_timeout() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0), fail: false });
        let batcher = EmbeddingBatcher::new(
            provider.clone(),
            BatcherConfig { max_batch_size: 2, flush_interval: Duration::from_secs(30), memory_budget_bytes: 1_000_000 },
        );
        let a = batcher.embed("one".to_string());
        let b = batcher.embed("two".to_string());
        let (ra, rb) = tokio::join!(a, b);
        assert!(ra.is_ok() && rb.is_ok());
    }

    #[tokio::test]
    async fn provider_failure_propagates_to_every_caller_in_the_batch() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0), fail: true });
        let batcher = EmbeddingBatcher::new(
            provider,
            BatcherConfig { max_batch_size: 2, flush_interval: Duration::from_millis(20), memory_budget_bytes: 1_000_000 },
        );
        let a = batcher.embed("one".to_string());
        let b = batcher.embed("two".to_string());
        let (ra, rb) = tokio::join!(a, b);
        assert!(ra.is_err());
        assert!(rb.is_err());
    }

    #[tokio::test]
    async fn embed_many_preserves_order() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0), fail: false });
        let batcher = EmbeddingBatcher::new(
            provider,
            BatcherConfig { max_batch_size: 8, flush_interval: Duration::from_millis(20), memory_budget_bytes: 1_000_000 },
        );
        let vectors = batcher
            .embed_many(vec!["a".to_string(), "bb".to_string(), "ccc".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![2.0], vec![3.0]]);
    }

    #[tokio::test]
    async fn embed_many_empty_input_short_circuits() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0), fail: false });
        let batcher = EmbeddingBatcher::new(
            provider.clone(),
            BatcherConfig { max_batch_size: 8, flush_interval: Duration::from_millis(20), memory_budget_bytes: 1_000_000 },
        );
        let vectors = batcher.embed_many(Vec::new()).await.unwrap();
        assert!(vectors.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn flush_drains_a_pending_request_before_its_timeout() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0), fail: false });
        let batcher = EmbeddingBatcher::new(
            provider.clone(),
            BatcherConfig { max_batch_size: 100, flush_interval: Duration::from_secs(30), memory_budget_bytes: 1_000_000 },
        );
        let pending = tokio::spawn({
            let batcher = batcher.clone();
            async move { batcher.embed("one".to_string()).await }
        });
        // Give the spawned call a chance to reach the flush loop's queue
        // before `flush()` is asked to drain it.
        tokio::time::sleep(Duration::from_millis(5)).await;
        batcher.flush().await.unwrap();
        assert!(pending.await.unwrap().is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_fails_requests_still_queued() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0), fail: false });
        let batcher = EmbeddingBatcher::new(
            provider,
            BatcherConfig { max_batch_size: 100, flush_interval: Duration::from_secs(30), memory_budget_bytes: 1_000_000 },
        );
        let batcher_clone = batcher.clone();
        let pending = tokio::spawn(async move { batcher_clone.embed("one".to_string()).await });
        batcher.shutdown().await;
        match pending.await.unwrap() {
            Err(BatcherError::Shutdown) => {}
            other => panic!("expected Shutdown, got {other:?}"),
        }
    }
}
