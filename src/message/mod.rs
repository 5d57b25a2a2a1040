//! Incoming-message ingestion.
//!
//! A [`MessagePipeline`] listens to a store's "message added" notifications,
//! waits out messages that arrive undecrypted, coalesces the results into
//! debounced batches and hands each batch to the registered consumers. On
//! teardown it persists everything it buffered so a restarted session can
//! pick it up again.

mod buffer;
mod callbacks;
mod retry;
mod unload;

pub use buffer::DeliveryBuffer;
pub use callbacks::{CallbackId, CallbackRegistry};

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::runtime::{Scheduler, TokioScheduler};
use crate::store::{MemorySessionStorage, MessageSource};
use log::debug;
use std::sync::Arc;
use tokio::task::JoinHandle;
use wacore::store::traits::{MessageNormalizer, SessionStorage};
use wacore::types::events::{Delivery, MessageHandler};
use wacore::types::message::{NormalizedMessage, RawMessage};

pub(crate) struct PipelineInner {
    pub(crate) config: IngestConfig,
    pub(crate) normalizer: Arc<dyn MessageNormalizer>,
    pub(crate) storage: Arc<dyn SessionStorage>,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) buffer: DeliveryBuffer,
    pub(crate) callbacks: CallbackRegistry,
}

impl PipelineInner {
    pub(crate) fn enqueue(self: &Arc<Self>, message: NormalizedMessage) {
        debug!("Queued message {} for delivery", message.id);
        if self.buffer.enqueue(message) {
            let inner = Arc::clone(self);
            self.scheduler.schedule(
                self.config.debounce_window,
                Box::pin(async move { inner.flush() }),
            );
        }
    }

    // The queue is taken (and the marker cleared) before any consumer runs,
    // so messages enqueued from a callback open the next window.
    fn flush(&self) {
        let batch = self.buffer.take_pending();
        debug!(
            "Debounce window closed, delivering {} message(s) to {} consumer(s)",
            batch.len(),
            self.callbacks.len()
        );
        self.callbacks.dispatch(&Delivery::Batch(batch.into()));
    }
}

/// Handle to a running "message added" listener.
///
/// Dropping the handle leaves the listener running; call
/// [`detach`](Self::detach) to unregister it.
#[derive(Debug)]
pub struct ListenerHandle {
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn detach(self) {
        self.task.abort();
    }

    pub fn is_attached(&self) -> bool {
        !self.task.is_finished()
    }
}

/// The ingestion pipeline. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MessagePipeline {
    inner: Arc<PipelineInner>,
}

impl MessagePipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &IngestConfig {
        &self.inner.config
    }

    /// Starts listening to `source`. Each notification is handed off without
    /// awaiting any per-message work.
    pub fn attach<S>(&self, source: &S) -> ListenerHandle
    where
        S: MessageSource + ?Sized,
    {
        let mut added = source.subscribe_added();
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(raw) = added.recv().await {
                inner.on_message_added(raw);
            }
            debug!("Message source closed, listener exiting");
        });
        ListenerHandle { task }
    }

    /// Feeds one "message added" notification into the pipeline, for hosts
    /// that deliver notifications themselves.
    pub fn on_message_added(&self, raw: RawMessage) {
        self.inner.on_message_added(Arc::new(raw));
    }

    /// Registers a consumer. One-shot consumers are removed after the first
    /// batch they receive.
    pub fn register_callback<H>(&self, handler: H, remove_after_use: bool) -> CallbackId
    where
        H: MessageHandler + 'static,
    {
        self.inner
            .callbacks
            .push(Some(Arc::new(handler)), remove_after_use)
    }

    pub fn unregister_callback(&self, id: CallbackId) -> bool {
        self.inner.callbacks.remove(id)
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.inner.callbacks
    }

    pub fn callback_count(&self) -> usize {
        self.inner.callbacks.len()
    }

    /// Messages waiting for the current debounce window to close.
    pub fn pending_messages(&self) -> Vec<NormalizedMessage> {
        self.inner.buffer.pending()
    }

    /// Every message buffered this session, delivered or not.
    pub fn buffered_messages(&self) -> Vec<NormalizedMessage> {
        self.inner.buffer.durable()
    }

    pub fn is_debounce_armed(&self) -> bool {
        self.inner.buffer.is_debounce_armed()
    }
}

#[derive(Default)]
pub struct PipelineBuilder {
    config: IngestConfig,
    normalizer: Option<Arc<dyn MessageNormalizer>>,
    storage: Option<Arc<dyn SessionStorage>>,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl PipelineBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_normalizer<N>(mut self, normalizer: N) -> Self
    where
        N: MessageNormalizer + 'static,
    {
        self.normalizer = Some(Arc::new(normalizer));
        self
    }

    /// Defaults to [`MemorySessionStorage`] when not set.
    pub fn with_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Defaults to [`TokioScheduler`] when not set.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> Result<MessagePipeline, IngestError> {
        let normalizer = self
            .normalizer
            .ok_or(IngestError::MissingComponent("message normalizer"))?;
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemorySessionStorage::new()));
        let scheduler = self.scheduler.unwrap_or_else(|| Arc::new(TokioScheduler));

        Ok(MessagePipeline {
            inner: Arc::new(PipelineInner {
                config: self.config,
                normalizer,
                storage,
                scheduler,
                buffer: DeliveryBuffer::new(),
                callbacks: CallbackRegistry::new(),
            }),
        })
    }
}
