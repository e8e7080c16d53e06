//! Errors surfaced to synchronous callers of the dispatcher.
//!
//! Failures on the asynchronous delivery path are never returned; they are
//! logged and reflected in the message record instead.

use courier_store::{MessageId, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The durable store rejected or failed the operation.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// The dispatcher has been shut down and accepts no new work.
    #[error("Dispatcher is shutting down")]
    ShuttingDown,

    /// No partition holds a message with this identifier.
    #[error("Message not found: {0}")]
    NotFound(MessageId),
}

impl DeliveryError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
