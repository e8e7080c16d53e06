use async_trait::async_trait;

use crate::{AuditPartition, MessageId, MessageRecord, OutboundMessage};

/// Durable storage for message records
///
/// Records live in exactly one of three partitions: pending, sent-audit, or
/// failed-audit. Promotion out of pending is the only way a record changes
/// partition, and implementations must make it appear atomic to readers of
/// the same store.
///
/// Implementations must be safe to share across tasks.
#[async_trait]
pub trait MessageStore: Send + Sync + std::fmt::Debug {
    /// Persist a new message in the pending partition
    ///
    /// Assigns an identifier and creation time when the request lacks them.
    ///
    /// # Errors
    /// `AlreadyExists` if any partition already holds the identifier, or a
    /// backend failure.
    async fn create(&self, message: OutboundMessage) -> crate::Result<MessageRecord>;

    /// Read a record from the pending partition
    ///
    /// Audit partitions are not searched; see [`MessageStore::find_audit`].
    ///
    /// # Errors
    /// `NotFound` if the record is not pending, or a backend failure.
    async fn get(&self, id: &MessageId) -> crate::Result<MessageRecord>;

    /// Up to `limit` pending records, oldest first
    ///
    /// # Errors
    /// If the partition cannot be read.
    async fn list_pending(&self, limit: usize) -> crate::Result<Vec<MessageRecord>>;

    /// Move a terminal record from pending into its audit partition
    ///
    /// The audit insert is idempotent: promoting an identifier that is already
    /// audited is not an error, and the pending copy is removed either way.
    ///
    /// # Errors
    /// `InvalidTransition` if the record is still pending, or a failure to
    /// remove the pending copy.
    async fn promote(&self, record: &MessageRecord) -> crate::Result<()>;

    /// Persist attempt count, last error and last-attempt time of a pending record
    ///
    /// # Errors
    /// `NotFound` if the record is no longer pending, `AttemptRegression` if
    /// the stored attempt count is higher, or a backend failure.
    async fn update_retry_state(&self, record: &MessageRecord) -> crate::Result<()>;

    /// Up to `limit` records of an audit partition, newest terminal timestamp first
    ///
    /// # Errors
    /// If the partition cannot be read.
    async fn list_audit(
        &self,
        partition: AuditPartition,
        limit: usize,
    ) -> crate::Result<Vec<MessageRecord>>;

    /// Point lookup in an audit partition
    ///
    /// # Errors
    /// If the partition cannot be read.
    async fn find_audit(
        &self,
        partition: AuditPartition,
        id: &MessageId,
    ) -> crate::Result<Option<MessageRecord>>;
}

/// Oldest first, identifier as tie-break
pub(crate) fn sort_pending(records: &mut [MessageRecord]) {
    records.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}

/// Newest terminal timestamp first, identifier as tie-break
pub(crate) fn sort_audit(records: &mut [MessageRecord]) {
    records.sort_by(|a, b| {
        b.terminal_at()
            .cmp(&a.terminal_at())
            .then_with(|| b.id().cmp(a.id()))
    });
}
