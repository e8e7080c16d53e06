//! Durable storage for outbound messages.
//!
//! Records are partitioned into pending, sent-audit and failed-audit. The
//! [`MessageStore`] trait is the seam the dispatcher depends on; backends live
//! in [`backends`].

pub mod backends;
pub mod config;
pub mod error;
pub mod message;
pub mod r#trait;
pub mod types;

pub use backends::{FileMessageStore, MemoryMessageStore, TestMessageStore};
pub use config::{MemoryConfig, StoreConfig};
pub use error::{Result, SerializationError, StoreError, ValidationError};
pub use message::{AuditPartition, MessageRecord, MessageState, OutboundMessage};
pub use r#trait::MessageStore;
pub use types::MessageId;
