use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use crate::{
    AuditPartition, MessageId, MessageRecord, OutboundMessage, StoreError,
    r#trait::{MessageStore, sort_audit, sort_pending},
};

#[derive(Debug, Default)]
struct Partitions {
    pending: HashMap<MessageId, MessageRecord>,
    sent: HashMap<MessageId, MessageRecord>,
    failed: HashMap<MessageId, MessageRecord>,
}

impl Partitions {
    const fn audit(&self, partition: AuditPartition) -> &HashMap<MessageId, MessageRecord> {
        match partition {
            AuditPartition::Sent => &self.sent,
            AuditPartition::Failed => &self.failed,
        }
    }

    const fn audit_mut(
        &mut self,
        partition: AuditPartition,
    ) -> &mut HashMap<MessageId, MessageRecord> {
        match partition {
            AuditPartition::Sent => &mut self.sent,
            AuditPartition::Failed => &mut self.failed,
        }
    }

    fn contains(&self, id: &MessageId) -> bool {
        self.pending.contains_key(id) || self.sent.contains_key(id) || self.failed.contains_key(id)
    }
}

/// In-memory message store
///
/// All three partitions sit behind a single `RwLock`, so a promotion (remove
/// from pending, insert into audit) happens inside one write critical section
/// and readers see it either fully before or fully after.
///
/// # Capacity Management
/// An optional capacity bounds the pending partition. Audit partitions are
/// append-only history and are not counted.
#[derive(Debug, Clone)]
pub struct MemoryMessageStore {
    partitions: Arc<RwLock<Partitions>>,
    capacity: Option<usize>,
}

impl MemoryMessageStore {
    /// Create a new empty store with unlimited capacity
    #[must_use]
    pub fn new() -> Self {
        Self {
            partitions: Arc::new(RwLock::new(Partitions::default())),
            capacity: None,
        }
    }

    /// Create a new store whose pending partition holds at most `capacity` records
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            partitions: Arc::new(RwLock::new(Partitions::default())),
            capacity: Some(capacity),
        }
    }

    /// Number of pending records
    ///
    /// Recovers gracefully if the lock is poisoned by accessing the underlying data.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.partitions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pending
            .len()
    }

    /// Number of records in an audit partition
    #[must_use]
    pub fn audit_len(&self, partition: AuditPartition) -> usize {
        self.partitions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .audit(partition)
            .len()
    }

    /// Get the configured capacity (None = unlimited)
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl Default for MemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn create(&self, message: OutboundMessage) -> crate::Result<MessageRecord> {
        let record = message.into_record();
        let mut partitions = self.partitions.write()?;

        if partitions.contains(record.id()) {
            return Err(StoreError::AlreadyExists(*record.id()));
        }

        if let Some(capacity) = self.capacity {
            let len = partitions.pending.len();
            if len >= capacity {
                return Err(StoreError::CapacityExceeded { len, capacity });
            }
        }

        partitions.pending.insert(*record.id(), record.clone());

        Ok(record)
    }

    async fn get(&self, id: &MessageId) -> crate::Result<MessageRecord> {
        self.partitions
            .read()?
            .pending
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }

    async fn list_pending(&self, limit: usize) -> crate::Result<Vec<MessageRecord>> {
        let mut records: Vec<_> = self.partitions.read()?.pending.values().cloned().collect();
        sort_pending(&mut records);
        records.truncate(limit);
        Ok(records)
    }

    async fn promote(&self, record: &MessageRecord) -> crate::Result<()> {
        let Some(partition) = AuditPartition::for_state(record.state()) else {
            return Err(StoreError::InvalidTransition {
                id: *record.id(),
                state: record.state(),
            });
        };

        let id = record.id();
        let mut partitions = self.partitions.write()?;

        if partitions.audit(partition).contains_key(id) {
            tracing::debug!(%id, %partition, "Audit record already present, ignoring");
            partitions.pending.remove(id);
            return Ok(());
        }

        if partitions.audit(partition.other()).contains_key(id) {
            return Err(StoreError::AlreadyPromoted {
                id: *id,
                partition: partition.other(),
            });
        }

        if partitions.pending.remove(id).is_none() {
            return Err(StoreError::NotFound(*id));
        }

        partitions.audit_mut(partition).insert(*id, record.clone());

        Ok(())
    }

    async fn update_retry_state(&self, record: &MessageRecord) -> crate::Result<()> {
        let mut partitions = self.partitions.write()?;

        let stored = partitions
            .pending
            .get_mut(record.id())
            .ok_or(StoreError::NotFound(*record.id()))?;

        if record.attempts() < stored.attempts() {
            return Err(StoreError::AttemptRegression {
                id: *record.id(),
                stored: stored.attempts(),
                proposed: record.attempts(),
            });
        }

        stored.apply_retry_state(record);

        Ok(())
    }

    async fn list_audit(
        &self,
        partition: AuditPartition,
        limit: usize,
    ) -> crate::Result<Vec<MessageRecord>> {
        let mut records: Vec<_> = self
            .partitions
            .read()?
            .audit(partition)
            .values()
            .cloned()
            .collect();
        sort_audit(&mut records);
        records.truncate(limit);
        Ok(records)
    }

    async fn find_audit(
        &self,
        partition: AuditPartition,
        id: &MessageId,
    ) -> crate::Result<Option<MessageRecord>> {
        Ok(self.partitions.read()?.audit(partition).get(id).cloned())
    }
}
