//! Worker pipeline: the consuming half of deferred-work context propagation.
//!
//! A [`WorkerPipeline`] polls an [`EnvelopeQueue`], decodes each envelope,
//! rebuilds an execution context from the captured references via a fresh
//! directory lookup, and runs the payload handler inside that scope. Restore
//! failures are classified — the distinct unresolvable-tenant error lets the
//! runnable choose retry, dead-letter, or drop instead of guessing a default
//! tenant.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tenon_core::{with_context, RestoreError, TenantDirectory, WorkEnvelope};
use tracing::{debug, error, info_span, warn, Instrument};

use super::queue::{EnvelopeQueue, QueueItem};

// ---------------------------------------------------------------------------
// WorkerConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for the worker pipeline.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Interval between queue polls when the queue has gone empty.
    pub poll_interval: Duration,
    /// Delivery attempts before a retry-disposed restore failure is parked.
    pub max_restore_attempts: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            max_restore_attempts: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// DeferredRunnable trait
// ---------------------------------------------------------------------------

/// What the pipeline does with an envelope whose context restore failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreDisposition {
    /// Re-enqueue for another delivery attempt (bounded by
    /// [`WorkerConfig::max_restore_attempts`]).
    Retry,
    /// Park the item in the dead-letter store.
    DeadLetter,
    /// Discard the item.
    Drop,
}

/// Trait for deferred-work handlers executed by [`WorkerPipeline`].
///
/// `run` executes inside the restored context scope, so the ambient query
/// operations (`current_tenant()` and friends) observe the identity captured
/// when the work was scheduled.
#[async_trait]
pub trait DeferredRunnable: Send + 'static {
    /// The payload type carried by this runnable's envelopes.
    type Payload: DeserializeOwned + Send + 'static;

    /// Processes a single payload inside the restored scope.
    ///
    /// # Errors
    ///
    /// Handler errors are logged by the pipeline and not retried — delivery
    /// is at-least-once, so retry semantics belong to the payload owner.
    async fn run(&mut self, payload: Self::Payload) -> anyhow::Result<()>;

    /// Chooses a disposition for a failed context restore.
    ///
    /// Default policy: a tenant that no longer resolves is permanent
    /// (dead-letter); a directory backend failure is transient (retry).
    fn on_restore_failure(&self, error: &RestoreError) -> RestoreDisposition {
        match error {
            RestoreError::UnresolvableTenant { .. } => RestoreDisposition::DeadLetter,
            RestoreError::Directory(_) => RestoreDisposition::Retry,
        }
    }

    /// Called once when the pipeline is shutting down. Default is a no-op.
    async fn shutdown(&mut self) {}
}

// ---------------------------------------------------------------------------
// WorkerPipeline
// ---------------------------------------------------------------------------

/// Background consumer of the envelope queue.
///
/// The pipeline spawns a tokio task that:
/// 1. Drains the queue whenever the poll interval ticks
/// 2. Restores each envelope's context and calls `DeferredRunnable::run()`
///    inside it
/// 3. Applies the runnable's disposition to restore failures
/// 4. Calls `DeferredRunnable::shutdown()` when stopped
pub struct WorkerPipeline {
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl WorkerPipeline {
    /// Starts the pipeline over the given queue and directory.
    pub fn start<R: DeferredRunnable + Sync>(
        mut runnable: R,
        queue: Arc<dyn EnvelopeQueue>,
        directory: Arc<dyn TenantDirectory>,
        config: WorkerConfig,
    ) -> Self
    where
        R::Payload: Sync,
    {
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut poll = tokio::time::interval(config.poll_interval);

            loop {
                tokio::select! {
                    _ = poll.tick() => {
                        drain_queue(&mut runnable, &queue, &directory, &config).await;
                    }
                    _ = &mut shutdown_rx => {
                        break;
                    }
                }
            }

            runnable.shutdown().await;
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Stops the pipeline gracefully, waiting for the worker task to complete.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore send errors -- the task may already have exited.
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

/// Pops until the queue reports empty, processing each item.
async fn drain_queue<R: DeferredRunnable>(
    runnable: &mut R,
    queue: &Arc<dyn EnvelopeQueue>,
    directory: &Arc<dyn TenantDirectory>,
    config: &WorkerConfig,
) {
    loop {
        match queue.pop().await {
            Ok(Some(item)) => process_item(runnable, queue, directory, config, item).await,
            Ok(None) => break,
            Err(error) => {
                warn!(%error, "envelope queue pop failed");
                break;
            }
        }
    }
}

async fn process_item<R: DeferredRunnable>(
    runnable: &mut R,
    queue: &Arc<dyn EnvelopeQueue>,
    directory: &Arc<dyn TenantDirectory>,
    config: &WorkerConfig,
    item: QueueItem,
) {
    let envelope = match WorkEnvelope::<R::Payload>::from_msgpack(&item.envelope) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(%error, "dead-lettering undecodable envelope");
            park(queue, item, "undecodable envelope".to_string()).await;
            return;
        }
    };

    match envelope.restore(directory.as_ref()).await {
        Ok(ctx) => {
            let tenant = ctx.tenant().map(|t| t.id.to_string());
            let span = info_span!(
                "deferred_job",
                tenant = tenant.as_deref(),
                attempts = item.attempts,
            );
            let result = with_context(ctx, runnable.run(envelope.payload))
                .instrument(span)
                .await;
            if let Err(error) = result {
                error!(%error, "deferred job failed");
            }
        }
        Err(restore_error) => {
            apply_disposition(runnable, queue, config, item, &restore_error).await;
        }
    }
}

async fn apply_disposition<R: DeferredRunnable>(
    runnable: &R,
    queue: &Arc<dyn EnvelopeQueue>,
    config: &WorkerConfig,
    item: QueueItem,
    error: &RestoreError,
) {
    match runnable.on_restore_failure(error) {
        RestoreDisposition::Retry => {
            if item.attempts + 1 >= config.max_restore_attempts {
                park(queue, item, format!("restore retries exhausted: {error}")).await;
            } else if let Err(push_error) = queue.push(item.next_attempt()).await {
                warn!(%push_error, "failed to re-enqueue envelope for retry");
            }
        }
        RestoreDisposition::DeadLetter => {
            park(queue, item, error.to_string()).await;
        }
        RestoreDisposition::Drop => {
            debug!(%error, "dropping envelope after restore failure");
        }
    }
}

async fn park(queue: &Arc<dyn EnvelopeQueue>, item: QueueItem, reason: String) {
    if let Err(error) = queue.dead_letter(item, reason).await {
        warn!(%error, "dead-letter store failed");
    }
}

/// Encodes `envelope` and pushes it onto `queue` as a first-delivery item.
///
/// Producer-side convenience so request handlers never touch the wire
/// format directly.
///
/// # Errors
///
/// Propagates envelope encoding failures and queue backend failures.
pub async fn enqueue<P: serde::Serialize>(
    queue: &dyn EnvelopeQueue,
    envelope: &WorkEnvelope<P>,
) -> anyhow::Result<()> {
    let bytes = envelope.to_msgpack()?;
    queue.push(QueueItem::new(bytes)).await
}
