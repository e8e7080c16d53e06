use std::sync::Arc;

use serde::Deserialize;

use crate::{
    backends::{FileMessageStore, MemoryMessageStore},
    r#trait::MessageStore,
};

/// Configuration for the message store
///
/// Selects the backend at runtime from the configuration file.
///
/// # Examples
///
/// File-backed store in RON config:
/// ```ron
/// Courier (
///     store: (
///         type: "File",
///         path: "/var/spool/courier",
///     ),
/// )
/// ```
///
/// Memory-backed store with a capacity limit:
/// ```ron
/// Courier (
///     store: (
///         type: "Memory",
///         capacity: 1000,
///     ),
/// )
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum StoreConfig {
    /// File-based store (production)
    File(FileMessageStore),
    /// Memory-based store (testing/development)
    Memory(MemoryConfig),
}

/// Configuration for the memory-backed store
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MemoryConfig {
    /// Maximum number of pending messages (omit for unlimited)
    #[serde(default)]
    pub capacity: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::File(FileMessageStore::default())
    }
}

impl StoreConfig {
    /// Filesystem root for file-backed stores
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::File(store) => Some(store.path()),
            Self::Memory(_) => None,
        }
    }

    /// Open the configured backend and return it as a trait object
    ///
    /// Safe to use against a store a running server owns; no crash repair is
    /// attempted.
    ///
    /// # Errors
    /// Returns an error if the file store cannot be opened on disk
    pub fn into_store(self) -> crate::Result<Arc<dyn MessageStore>> {
        match self {
            Self::File(store) => {
                store.open()?;
                Ok(Arc::new(store))
            }
            Self::Memory(config) => Ok(config.into_store()),
        }
    }

    /// Open the configured backend and repair crash residue before returning it
    ///
    /// Intended for the process that serves the store.
    ///
    /// # Errors
    /// Returns an error if the file store cannot be opened or repaired
    pub fn into_recovered_store(self) -> crate::Result<Arc<dyn MessageStore>> {
        match self {
            Self::File(store) => {
                store.recover()?;
                Ok(Arc::new(store))
            }
            Self::Memory(config) => Ok(config.into_store()),
        }
    }
}

impl MemoryConfig {
    fn into_store(self) -> Arc<dyn MessageStore> {
        self.capacity.map_or_else(
            || Arc::new(MemoryMessageStore::new()) as Arc<dyn MessageStore>,
            |capacity| Arc::new(MemoryMessageStore::with_capacity(capacity)),
        )
    }
}
