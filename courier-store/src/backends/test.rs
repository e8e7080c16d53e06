use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::memory::MemoryMessageStore;
use crate::{
    AuditPartition, MessageId, MessageRecord, OutboundMessage, StoreError, r#trait::MessageStore,
};

/// Testing utilities for the memory-backed store
///
/// Wakes waiters on every mutation so tests can await a disposition instead
/// of sleeping, and can be told to fail the next N retry-state updates or
/// promotions to exercise persistence-failure paths.
#[derive(Debug, Clone, Default)]
pub struct TestMessageStore {
    inner: MemoryMessageStore,
    notify: Arc<Notify>,
    failing_updates: Arc<AtomicUsize>,
    failing_promotions: Arc<AtomicUsize>,
}

/// Consume one unit of an injected-failure budget, if any is left
fn take_failure(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl TestMessageStore {
    /// Create a new test store
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` calls to `update_retry_state` fail
    pub fn fail_next_updates(&self, count: usize) {
        self.failing_updates.store(count, Ordering::SeqCst);
    }

    /// The next `count` calls to `promote` fail
    pub fn fail_next_promotions(&self, count: usize) {
        self.failing_promotions.store(count, Ordering::SeqCst);
    }

    /// Number of pending records
    pub fn pending_count(&self) -> usize {
        self.inner.pending_len()
    }

    /// Number of records in an audit partition
    pub fn audit_count(&self, partition: AuditPartition) -> usize {
        self.inner.audit_len(partition)
    }

    /// Wait until an audit partition holds at least `expected` records
    ///
    /// # Errors
    /// Returns an error if the timeout is reached first
    pub async fn wait_for_audit(
        &self,
        partition: AuditPartition,
        expected: usize,
        timeout: Duration,
    ) -> crate::Result<()> {
        self.wait_until(timeout, || self.audit_count(partition) >= expected)
            .await
            .map_err(|()| {
                StoreError::Internal(format!(
                    "Timeout waiting for {expected} {partition} records, have {}",
                    self.audit_count(partition)
                ))
            })
    }

    async fn wait_until(&self, timeout: Duration, condition: impl Fn() -> bool) -> Result<(), ()> {
        tokio::time::timeout(timeout, async {
            loop {
                // Registered before the check so a mutation in between is not missed
                let notified = self.notify.notified();
                if condition() {
                    return;
                }
                notified.await;
            }
        })
        .await
        .map_err(|_| ())
    }
}

#[async_trait]
impl MessageStore for TestMessageStore {
    async fn create(&self, message: OutboundMessage) -> crate::Result<MessageRecord> {
        let record = self.inner.create(message).await?;
        self.notify.notify_waiters();
        Ok(record)
    }

    async fn get(&self, id: &MessageId) -> crate::Result<MessageRecord> {
        self.inner.get(id).await
    }

    async fn list_pending(&self, limit: usize) -> crate::Result<Vec<MessageRecord>> {
        self.inner.list_pending(limit).await
    }

    async fn promote(&self, record: &MessageRecord) -> crate::Result<()> {
        if take_failure(&self.failing_promotions) {
            return Err(StoreError::Internal("injected promotion failure".to_string()));
        }

        self.inner.promote(record).await?;
        self.notify.notify_waiters();
        Ok(())
    }

    async fn update_retry_state(&self, record: &MessageRecord) -> crate::Result<()> {
        if take_failure(&self.failing_updates) {
            return Err(StoreError::Internal("injected update failure".to_string()));
        }

        self.inner.update_retry_state(record).await?;
        self.notify.notify_waiters();
        Ok(())
    }

    async fn list_audit(
        &self,
        partition: AuditPartition,
        limit: usize,
    ) -> crate::Result<Vec<MessageRecord>> {
        self.inner.list_audit(partition, limit).await
    }

    async fn find_audit(
        &self,
        partition: AuditPartition,
        id: &MessageId,
    ) -> crate::Result<Option<MessageRecord>> {
        self.inner.find_audit(partition, id).await
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = TestMessageStore::new();
        let mut record = store
            .create(OutboundMessage::new("a@example.com", "s", "b"))
            .await
            .expect("create");

        store.fail_next_updates(1);
        record.record_failure("boom", SystemTime::now());
        assert!(store.update_retry_state(&record).await.is_err());
        store.update_retry_state(&record).await.expect("second update");

        store.fail_next_promotions(1);
        record.mark_sent(SystemTime::now());
        assert!(store.promote(&record).await.is_err());
        assert_eq!(store.pending_count(), 1);
        store.promote(&record).await.expect("second promote");
        assert_eq!(store.audit_count(AuditPartition::Sent), 1);
    }

    #[tokio::test]
    async fn test_wait_for_audit_wakes_on_promotion() {
        let store = TestMessageStore::new();
        let mut record = store
            .create(OutboundMessage::new("a@example.com", "s", "b"))
            .await
            .expect("create");

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .wait_for_audit(AuditPartition::Failed, 1, Duration::from_secs(5))
                    .await
            })
        };

        record.mark_failed("gave up", SystemTime::now());
        store.promote(&record).await.expect("promote");

        waiter.await.expect("join").expect("wait");
    }

    #[tokio::test]
    async fn test_wait_for_audit_times_out() {
        let store = TestMessageStore::new();
        let err = store
            .wait_for_audit(AuditPartition::Sent, 1, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Timeout"));
    }
}
