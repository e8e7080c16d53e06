//! Error types for the courier-store crate.
//!
//! This module provides typed error handling for store operations including
//! file I/O, serialization, validation, and illegal partition transitions.

use std::io;

use thiserror::Error;

use crate::{AuditPartition, MessageId, MessageState};

/// Top-level store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O operation failed (file read/write/rename/delete).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Message not found in the pending partition.
    #[error("Message not found: {0}")]
    NotFound(MessageId),

    /// A record with this identifier already exists in some partition.
    #[error("Message already exists: {0}")]
    AlreadyExists(MessageId),

    /// The record is not in a state that allows the requested transition.
    #[error("Message {id} cannot be promoted while {state}")]
    InvalidTransition { id: MessageId, state: MessageState },

    /// The record already sits in the audit partition for the other outcome.
    #[error("Message {id} was already promoted to {partition}")]
    AlreadyPromoted {
        id: MessageId,
        partition: AuditPartition,
    },

    /// An update tried to lower the persisted attempt count.
    #[error("Message {id} attempt count cannot go from {stored} to {proposed}")]
    AttemptRegression {
        id: MessageId,
        stored: u32,
        proposed: u32,
    },

    /// The pending partition is full.
    #[error("Store capacity exceeded: {len}/{capacity} pending messages")]
    CapacityExceeded { len: usize, capacity: usize },

    /// Store path validation failed.
    #[error("Store validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Internal error (lock poisoning, injected failures, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serialization and deserialization errors.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// Bincode serialization failed.
    #[error("Bincode encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Bincode deserialization failed.
    #[error("Bincode decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Store directory validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Store path cannot contain '..' components: {0}")]
    ParentDirectory(String),

    #[error("Store path must be absolute: {0}")]
    NotAbsolute(String),

    #[error("Store path cannot be in system directory {prefix}: {path}")]
    SystemDirectory { prefix: &'static str, path: String },

    #[error("Expected {0} to be a directory, but it is not")]
    NotDirectory(String),
}

/// Specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}

impl From<bincode::error::EncodeError> for StoreError {
    fn from(e: bincode::error::EncodeError) -> Self {
        Self::Serialization(e.into())
    }
}

impl From<bincode::error::DecodeError> for StoreError {
    fn from(e: bincode::error::DecodeError) -> Self {
        Self::Serialization(e.into())
    }
}

impl StoreError {
    /// Returns `true` if the error means the record simply is not there.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let store_err: StoreError = io_err.into();
        assert!(matches!(store_err, StoreError::Io(_)));
        assert!(!store_err.is_not_found());
    }

    #[test]
    fn test_invalid_transition_display() {
        let id = MessageId::generate();
        let err = StoreError::InvalidTransition {
            id,
            state: MessageState::Pending,
        };
        assert_eq!(
            err.to_string(),
            format!("Message {id} cannot be promoted while pending")
        );
    }

    #[test]
    fn test_already_promoted_display() {
        let id = MessageId::generate();
        let err = StoreError::AlreadyPromoted {
            id,
            partition: AuditPartition::Sent,
        };
        assert_eq!(
            err.to_string(),
            format!("Message {id} was already promoted to sent")
        );
    }

    #[test]
    fn test_validation_error_chain() {
        let err: StoreError = ValidationError::NotAbsolute("relative/path".to_string()).into();
        assert!(err.to_string().contains("must be absolute"));
    }
}
