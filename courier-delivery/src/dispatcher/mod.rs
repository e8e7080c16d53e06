//! Dispatcher orchestration
//!
//! One consumer task drives every delivery attempt. It wakes on either an
//! identifier from the in-memory queue or a reconciliation tick, and handles
//! each strictly in turn, so a message is never attempted twice at once.

mod attempt;
mod reconcile;

use std::sync::Arc;

use courier_common::internal;
use courier_store::{MessageId, MessageStore, OutboundMessage};
use parking_lot::Mutex;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;

use crate::{DeliveryError, DispatcherConfig, RetryPolicy, Transport};

/// Owns the work queue, the reconciliation timer and the consumer task
///
/// The in-memory queue is a fast path only: it carries identifiers, and the
/// durable store remains the source of truth. Anything that does not fit in
/// the queue, or is lost from it, is found again by the next sweep.
///
/// Cloning yields another handle to the same dispatcher.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

#[derive(Debug)]
pub(crate) struct Inner {
    config: DispatcherConfig,
    policy: RetryPolicy,
    store: Arc<dyn MessageStore>,
    transport: Arc<dyn Transport>,
    sender: mpsc::Sender<MessageId>,
    receiver: Mutex<Option<mpsc::Receiver<MessageId>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// Create a dispatcher; nothing runs until [`Dispatcher::begin`]
    pub fn new(
        config: DispatcherConfig,
        store: Arc<dyn MessageStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let config = config.normalised();
        let (sender, receiver) = mpsc::channel(config.queue_capacity);

        Self {
            inner: Arc::new(Inner {
                policy: config.retry_policy(),
                config,
                store,
                transport,
                sender,
                receiver: Mutex::new(Some(receiver)),
                worker: Mutex::new(None),
                cancel: CancellationToken::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.inner.store
    }

    /// Persist a message as pending and hand it to the consumer
    ///
    /// Succeeds as soon as the message is durable. A full queue is not an
    /// error; the message waits for the reconciliation sweep instead.
    ///
    /// # Errors
    /// - `ShuttingDown` once [`Dispatcher::shutdown`] has been called
    /// - `Persistence` if the store rejects the message
    pub async fn submit(&self, message: OutboundMessage) -> Result<MessageId, DeliveryError> {
        if self.inner.cancel.is_cancelled() {
            return Err(DeliveryError::ShuttingDown);
        }

        let record = self.inner.store.create(message).await?;
        let id = *record.id();

        match self.inner.sender.try_send(id) {
            Ok(()) => tracing::debug!(%id, "Queued message for delivery"),
            Err(TrySendError::Full(_)) => {
                tracing::debug!(%id, "Work queue full, leaving message for reconciliation");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(%id, "Dispatcher stopped, message remains pending");
            }
        }

        Ok(id)
    }

    /// Start the consumer task
    ///
    /// The first reconciliation sweep runs immediately, so messages left
    /// pending by a previous run are retried without waiting for a tick.
    /// Calling this more than once has no further effect.
    pub fn begin(&self) {
        let Some(receiver) = self.inner.receiver.lock().take() else {
            internal!(level = WARN, "Dispatcher already started");
            return;
        };

        internal!(
            level = INFO,
            "Dispatcher starting: max_attempts={}, retry_window={}s, reconciliation_interval={}ms, queue_capacity={}",
            self.inner.config.max_attempts,
            self.inner.config.max_retry_window_secs,
            self.inner.config.reconciliation_interval_ms,
            self.inner.config.queue_capacity
        );

        let handle = tokio::spawn(Arc::clone(&self.inner).run(receiver));
        *self.inner.worker.lock() = Some(handle);
    }

    /// Stop accepting work and wait for the consumer task to exit
    ///
    /// An attempt in flight is abandoned without being recorded; the message
    /// stays pending and is retried on the next start. Queued identifiers are
    /// dropped for the same reason.
    pub async fn shutdown(&self) {
        internal!(level = INFO, "Dispatcher shutting down");
        self.inner.cancel.cancel();

        // Never started: nothing to wait for, but stop the queue accepting
        drop(self.inner.receiver.lock().take());

        let worker = self.inner.worker.lock().take();
        if let Some(worker) = worker
            && let Err(e) = worker.await
        {
            tracing::error!(error = %e, "Dispatcher task ended abnormally");
        }

        internal!(level = INFO, "Dispatcher shutdown complete");
    }

    /// Whether [`Dispatcher::shutdown`] has been called
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

impl Inner {
    async fn run(self: Arc<Self>, mut receiver: mpsc::Receiver<MessageId>) {
        let mut ticker = tokio::time::interval(self.config.reconciliation_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => self.reconcile().await,
                Some(id) = receiver.recv() => self.process(id).await,
            }
        }

        receiver.close();
        let mut dropped = 0_usize;
        while receiver.try_recv().is_ok() {
            dropped += 1;
        }

        internal!(
            level = INFO,
            "Dispatcher stopped, {dropped} queued messages left pending"
        );
    }

    /// Handle an identifier taken from the work queue
    async fn process(&self, id: MessageId) {
        match self.store.get(&id).await {
            Ok(record) => self.attempt(record).await,
            Err(e) if e.is_not_found() => {
                tracing::debug!(%id, "Queued message already settled, skipping");
            }
            Err(e) => tracing::error!(%id, error = %e, "Failed to load queued message"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use courier_store::{MemoryMessageStore, TestMessageStore};

    use super::*;
    use crate::LogTransport;

    fn dispatcher(store: Arc<dyn MessageStore>, queue_capacity: usize) -> Dispatcher {
        Dispatcher::new(
            DispatcherConfig {
                queue_capacity,
                ..DispatcherConfig::default()
            },
            store,
            Arc::new(LogTransport),
        )
    }

    #[tokio::test]
    async fn test_submit_succeeds_when_queue_is_full() {
        let store = TestMessageStore::new();
        let dispatcher = dispatcher(Arc::new(store.clone()), 1);

        for n in 0..3 {
            dispatcher
                .submit(OutboundMessage::new(format!("user{n}@example.com"), "s", "b"))
                .await
                .expect("submit never fails on a full queue");
        }

        assert_eq!(store.pending_count(), 3);
    }

    #[tokio::test]
    async fn test_submit_surfaces_persistence_errors() {
        let dispatcher = dispatcher(Arc::new(MemoryMessageStore::with_capacity(1)), 10);

        dispatcher
            .submit(OutboundMessage::new("a@example.com", "s", "b"))
            .await
            .expect("first fits");

        let err = dispatcher
            .submit(OutboundMessage::new("b@example.com", "s", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_submit_rejected_after_shutdown() {
        let store = TestMessageStore::new();
        let dispatcher = dispatcher(Arc::new(store.clone()), 10);

        dispatcher.shutdown().await;
        assert!(dispatcher.is_shutting_down());

        let err = dispatcher
            .submit(OutboundMessage::new("a@example.com", "s", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::ShuttingDown));
        assert_eq!(store.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_begin_twice_is_harmless() {
        let dispatcher = dispatcher(Arc::new(TestMessageStore::new()), 10);

        dispatcher.begin();
        dispatcher.begin();

        tokio::time::timeout(std::time::Duration::from_secs(5), dispatcher.shutdown())
            .await
            .expect("shutdown completes");
    }

    #[test]
    fn test_zero_config_is_normalised() {
        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                queue_capacity: 0,
                max_attempts: 0,
                ..DispatcherConfig::default()
            },
            Arc::new(MemoryMessageStore::new()),
            Arc::new(LogTransport),
        );

        assert_eq!(dispatcher.config().queue_capacity, 100);
        assert_eq!(dispatcher.config().max_attempts, 3);
    }
}
