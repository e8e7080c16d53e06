//! Backend storage implementations for the message store
//!
//! - `memory`: In-memory storage for tests and transient deployments
//! - `test`: Memory storage with synchronization and failure injection
//! - `file`: File-based storage for production use

pub mod file;
pub mod memory;
pub mod test;

pub use file::{FileMessageStore, FileMessageStoreBuilder};
pub use memory::MemoryMessageStore;
pub use test::TestMessageStore;
