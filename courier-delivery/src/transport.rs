use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Outcome of a failed delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The attempt did not finish in time.
    #[error("Delivery attempt timed out after {0:?}")]
    Timeout(Duration),
}

/// Something that can deliver one message
///
/// A transport only reports success or failure; retrying is the dispatcher's
/// job. Calls are never made concurrently for the same message, but an
/// implementation may be shared across dispatchers.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Attempt delivery of a single message
    ///
    /// # Errors
    /// Any failure to deliver; the message is retried according to policy.
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), TransportError>;
}

/// Transport that logs each message and reports success
///
/// Useful for development and for running the queue without a mail relay.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        tracing::info!(recipient, subject, body_len = body.len(), "Delivered message");
        Ok(())
    }
}
