//! Query side of the dispatcher
//!
//! Control surfaces (the CLI, an HTTP layer) depend on this trait rather than
//! on [`Dispatcher`] itself.

use async_trait::async_trait;
use courier_store::{AuditPartition, MessageId, MessageRecord, MessageState};

use crate::{DeliveryError, Dispatcher};

/// Current disposition of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageStatus {
    pub id: MessageId,
    pub state: MessageState,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl From<&MessageRecord> for MessageStatus {
    fn from(record: &MessageRecord) -> Self {
        Self {
            id: *record.id(),
            state: record.state(),
            attempts: record.attempts(),
            last_error: record.last_error().map(ToString::to_string),
        }
    }
}

/// Status and audit queries over the delivery queue
#[async_trait]
pub trait DeliveryQueryService: Send + Sync {
    /// Where a message currently stands
    ///
    /// # Errors
    /// `NotFound` if no partition holds the message, or a store failure.
    async fn status(&self, id: &MessageId) -> Result<MessageStatus, DeliveryError>;

    /// Most recently sent messages, newest first
    ///
    /// # Errors
    /// If the sent-audit partition cannot be read.
    async fn list_sent(&self, limit: usize) -> Result<Vec<MessageRecord>, DeliveryError>;

    /// Most recently abandoned messages, newest first
    ///
    /// # Errors
    /// If the failed-audit partition cannot be read.
    async fn list_failed(&self, limit: usize) -> Result<Vec<MessageRecord>, DeliveryError>;
}

#[async_trait]
impl DeliveryQueryService for Dispatcher {
    async fn status(&self, id: &MessageId) -> Result<MessageStatus, DeliveryError> {
        let store = self.store();

        match store.get(id).await {
            Ok(record) => return Ok(MessageStatus::from(&record)),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        for partition in [AuditPartition::Sent, AuditPartition::Failed] {
            if let Some(record) = store.find_audit(partition, id).await? {
                return Ok(MessageStatus::from(&record));
            }
        }

        Err(DeliveryError::NotFound(*id))
    }

    async fn list_sent(&self, limit: usize) -> Result<Vec<MessageRecord>, DeliveryError> {
        Ok(self.store().list_audit(AuditPartition::Sent, limit).await?)
    }

    async fn list_failed(&self, limit: usize) -> Result<Vec<MessageRecord>, DeliveryError> {
        Ok(self.store().list_audit(AuditPartition::Failed, limit).await?)
    }
}
