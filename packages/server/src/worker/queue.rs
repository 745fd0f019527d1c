//! The durable-queue collaborator boundary.
//!
//! The worker pipeline consumes encoded envelopes from an [`EnvelopeQueue`].
//! The queue stores opaque bytes plus delivery metadata — it never holds a
//! live execution context, which is what lets an envelope cross into a
//! process that shares nothing with the scheduler but the tenant directory.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One queued unit of deferred work: the MsgPack-encoded
/// [`WorkEnvelope`](tenon_core::WorkEnvelope) plus delivery metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Encoded envelope bytes.
    #[serde(with = "serde_bytes")]
    pub envelope: Vec<u8>,
    /// Delivery attempts so far.
    pub attempts: u32,
}

impl QueueItem {
    /// Wraps freshly encoded envelope bytes for first delivery.
    #[must_use]
    pub fn new(envelope: Vec<u8>) -> Self {
        Self {
            envelope,
            attempts: 0,
        }
    }

    /// The same item, marked as having been attempted once more.
    #[must_use]
    pub fn next_attempt(mut self) -> Self {
        self.attempts += 1;
        self
    }
}

/// An item parked after the pipeline gave up on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    /// The item as it was when parked.
    pub item: QueueItem,
    /// Why the pipeline gave up.
    pub reason: String,
}

/// Queue interface between the request pipeline (producer) and the worker
/// pipeline (consumer).
///
/// Delivery is at-least-once; deferred logic must be idempotent, which is
/// the payload owner's responsibility. No ordering is guaranteed between the
/// scheduling request's completion and an item's delivery.
#[async_trait]
pub trait EnvelopeQueue: Send + Sync {
    /// Enqueues an item for later delivery.
    async fn push(&self, item: QueueItem) -> anyhow::Result<()>;

    /// Dequeues the next item, or `None` when the queue is empty.
    async fn pop(&self) -> anyhow::Result<Option<QueueItem>>;

    /// Parks an item the pipeline will not retry.
    async fn dead_letter(&self, item: QueueItem, reason: String) -> anyhow::Result<()>;

    /// Number of items currently awaiting delivery.
    fn depth(&self) -> usize;
}

/// In-memory [`EnvelopeQueue`] with a dead-letter parking lot.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    items: Mutex<VecDeque<QueueItem>>,
    parked: Mutex<Vec<DeadLetter>>,
}

impl InMemoryQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the dead-letter parking lot.
    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.parked.lock().clone()
    }
}

#[async_trait]
impl EnvelopeQueue for InMemoryQueue {
    async fn push(&self, item: QueueItem) -> anyhow::Result<()> {
        self.items.lock().push_back(item);
        Ok(())
    }

    async fn pop(&self) -> anyhow::Result<Option<QueueItem>> {
        Ok(self.items.lock().pop_front())
    }

    async fn dead_letter(&self, item: QueueItem, reason: String) -> anyhow::Result<()> {
        self.parked.lock().push(DeadLetter { item, reason });
        Ok(())
    }

    fn depth(&self) -> usize {
        self.items.lock().len()
    }
}
