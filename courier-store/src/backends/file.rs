use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use courier_common::internal;
use serde::Deserialize;
use tokio::{fs, sync::RwLock};

use crate::{
    AuditPartition, MessageId, MessageRecord, OutboundMessage, StoreError, ValidationError,
    r#trait::{MessageStore, sort_audit, sort_pending},
};

const PENDING: &str = "pending";
const TEMP_PREFIX: &str = ".tmp_";

/// File-based message store
///
/// Each partition is a directory under the store root (`pending/`, `sent/`,
/// `failed/`) holding one bincode file per record, named `{ulid}.bin`.
///
/// # Atomicity
/// Every write goes to `.tmp_{ulid}.bin` first and is then renamed into
/// place, so a crash never leaves a half-written record visible. Promotion
/// writes the audit copy before removing the pending one; a crash between the
/// two leaves a duplicate that [`FileMessageStore::recover`] repairs on startup.
///
/// Within a process all operations go through one transition lock, so readers
/// of the same store never observe a record in both or neither partition.
#[derive(Debug, Clone)]
pub struct FileMessageStore {
    path: PathBuf,
    transition: Arc<RwLock<()>>,
}

impl Default for FileMessageStore {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/spool/courier"),
            transition: Arc::default(),
        }
    }
}

impl<'de> Deserialize<'de> for FileMessageStore {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct FileMessageStoreHelper {
            path: PathBuf,
        }

        let helper = FileMessageStoreHelper::deserialize(deserializer)?;
        Self::validate_path(&helper.path).map_err(serde::de::Error::custom)?;

        Ok(Self {
            path: helper.path,
            transition: Arc::default(),
        })
    }
}

fn encode(record: &MessageRecord) -> crate::Result<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(
        record,
        bincode::config::standard(),
    )?)
}

fn decode(bytes: &[u8]) -> crate::Result<MessageRecord> {
    let (record, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(record)
}

impl FileMessageStore {
    /// Validate a store path
    ///
    /// # Security Checks
    /// - Rejects paths containing `..` (directory traversal)
    /// - Rejects paths to sensitive system directories
    /// - Ensures the path is absolute
    ///
    /// # Errors
    /// Returns an error if the path is invalid or potentially dangerous
    fn validate_path(path: &Path) -> Result<(), ValidationError> {
        if path
            .components()
            .any(|component| component == std::path::Component::ParentDir)
        {
            return Err(ValidationError::ParentDirectory(path.display().to_string()));
        }

        if !path.is_absolute() {
            return Err(ValidationError::NotAbsolute(path.display().to_string()));
        }

        let sensitive_prefixes = [
            "/etc", "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/boot", "/sys", "/proc", "/dev",
        ];

        for prefix in sensitive_prefixes {
            if path.starts_with(prefix) {
                return Err(ValidationError::SystemDirectory {
                    prefix,
                    path: path.display().to_string(),
                });
            }
        }

        Ok(())
    }

    /// Create a new `FileMessageStore` builder
    #[must_use]
    pub fn builder() -> FileMessageStoreBuilder {
        FileMessageStoreBuilder::default()
    }

    /// The store root
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn pending_dir(&self) -> PathBuf {
        self.path.join(PENDING)
    }

    fn audit_dir(&self, partition: AuditPartition) -> PathBuf {
        self.path.join(partition.as_str())
    }

    /// Open the store on disk
    ///
    /// Creates the partition directories if they are missing. Nothing else is
    /// touched, so this is safe against a store another process is serving.
    ///
    /// # Errors
    /// - If a directory cannot be created
    /// - If the root exists but is not a directory
    pub fn open(&self) -> crate::Result<()> {
        if self.path.try_exists()? && !self.path.is_dir() {
            return Err(ValidationError::NotDirectory(self.path.display().to_string()).into());
        }

        for dir in [
            self.pending_dir(),
            self.audit_dir(AuditPartition::Sent),
            self.audit_dir(AuditPartition::Failed),
        ] {
            std::fs::create_dir_all(dir)?;
        }

        Ok(())
    }

    /// Open the store and repair what a crash left behind
    ///
    /// Removes orphaned temporary files and pending records that already have
    /// an audit copy (left behind by a crash mid-promotion). Only the process
    /// that serves the store may call this: a temporary file belonging to
    /// another live writer would be deleted under it.
    ///
    /// # Errors
    /// - If a directory cannot be created or read
    /// - If the root exists but is not a directory
    pub fn recover(&self) -> crate::Result<()> {
        internal!("Recovering message store at {}", self.path.display());

        self.open()?;

        let pending = self.pending_dir();
        let sent = self.audit_dir(AuditPartition::Sent);
        let failed = self.audit_dir(AuditPartition::Failed);

        for dir in [&pending, &sent, &failed] {
            Self::cleanup_temp_files(dir)?;
        }

        let mut repaired = 0;
        for entry in std::fs::read_dir(&pending)? {
            let entry = entry?;
            let filename = entry.file_name();
            let Some(id) = MessageId::from_filename(&filename.to_string_lossy()) else {
                continue;
            };

            if sent.join(id.filename()).exists() || failed.join(id.filename()).exists() {
                std::fs::remove_file(entry.path())?;
                repaired += 1;
            }
        }

        if repaired > 0 {
            internal!(
                level = WARN,
                "Removed {repaired} pending records that were already promoted"
            );
        }

        Ok(())
    }

    fn cleanup_temp_files(dir: &Path) -> crate::Result<()> {
        let mut cleaned = 0;

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                std::fs::remove_file(entry.path())?;
                cleaned += 1;
            }
        }

        if cleaned > 0 {
            internal!(
                level = INFO,
                "Cleaned up {cleaned} orphaned temporary files from {}",
                dir.display()
            );
        }

        Ok(())
    }

    async fn write_record(dir: &Path, record: &MessageRecord) -> crate::Result<()> {
        let filename = record.id().filename();
        let temp_path = dir.join(format!("{TEMP_PREFIX}{filename}"));

        fs::write(&temp_path, encode(record)?).await?;
        fs::rename(&temp_path, dir.join(filename)).await?;

        Ok(())
    }

    async fn read_record(path: &Path) -> crate::Result<Option<MessageRecord>> {
        match fs::read(path).await {
            Ok(bytes) => decode(&bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_dir(dir: &Path) -> crate::Result<Vec<MessageRecord>> {
        let mut entries = fs::read_dir(dir).await?;
        let mut records = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name();
            if MessageId::from_filename(&filename.to_string_lossy()).is_none() {
                continue;
            }

            match Self::read_record(&entry.path()).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %entry.path().display(),
                        error = %e,
                        "Skipping unreadable message record"
                    );
                }
            }
        }

        Ok(records)
    }

    async fn remove_pending(path: &Path) -> crate::Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists_anywhere(&self, id: &MessageId) -> crate::Result<bool> {
        let filename = id.filename();
        for dir in [
            self.pending_dir(),
            self.audit_dir(AuditPartition::Sent),
            self.audit_dir(AuditPartition::Failed),
        ] {
            if fs::try_exists(dir.join(&filename)).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl MessageStore for FileMessageStore {
    async fn create(&self, message: OutboundMessage) -> crate::Result<MessageRecord> {
        let record = message.into_record();
        let _guard = self.transition.write().await;

        if self.exists_anywhere(record.id()).await? {
            return Err(StoreError::AlreadyExists(*record.id()));
        }

        Self::write_record(&self.pending_dir(), &record).await?;

        internal!(level = DEBUG, "Stored pending message {}", record.id());

        Ok(record)
    }

    async fn get(&self, id: &MessageId) -> crate::Result<MessageRecord> {
        let _guard = self.transition.read().await;

        Self::read_record(&self.pending_dir().join(id.filename()))
            .await?
            .ok_or(StoreError::NotFound(*id))
    }

    async fn list_pending(&self, limit: usize) -> crate::Result<Vec<MessageRecord>> {
        let _guard = self.transition.read().await;

        let mut records = Self::read_dir(&self.pending_dir()).await?;
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

        let _guard = self.transition.write().await;

        let id = record.id();
        let filename = id.filename();
        let pending_path = self.pending_dir().join(&filename);
        let audit_dir = self.audit_dir(partition);

        if fs::try_exists(audit_dir.join(&filename)).await? {
            internal!(
                level = DEBUG,
                "Audit record {id} already present in {partition}, ignoring"
            );
            return Self::remove_pending(&pending_path).await;
        }

        if fs::try_exists(self.audit_dir(partition.other()).join(&filename)).await? {
            return Err(StoreError::AlreadyPromoted {
                id: *id,
                partition: partition.other(),
            });
        }

        if !fs::try_exists(&pending_path).await? {
            return Err(StoreError::NotFound(*id));
        }

        if let Err(e) = Self::write_record(&audit_dir, record).await {
            // The audit trail is secondary; never let it block leaving pending
            tracing::warn!(%id, %partition, error = %e, "Failed to write audit record");
        }

        Self::remove_pending(&pending_path).await?;

        internal!(level = DEBUG, "Promoted message {id} to {partition}");

        Ok(())
    }

    async fn update_retry_state(&self, record: &MessageRecord) -> crate::Result<()> {
        let _guard = self.transition.write().await;

        let pending = self.pending_dir();
        let mut stored = Self::read_record(&pending.join(record.id().filename()))
            .await?
            .ok_or(StoreError::NotFound(*record.id()))?;

        if record.attempts() < stored.attempts() {
            return Err(StoreError::AttemptRegression {
                id: *record.id(),
                stored: stored.attempts(),
                proposed: record.attempts(),
            });
        }

        stored.apply_retry_state(record);
        Self::write_record(&pending, &stored).await
    }

    async fn list_audit(
        &self,
        partition: AuditPartition,
        limit: usize,
    ) -> crate::Result<Vec<MessageRecord>> {
        let _guard = self.transition.read().await;

        let mut records = Self::read_dir(&self.audit_dir(partition)).await?;
        sort_audit(&mut records);
        records.truncate(limit);

        Ok(records)
    }

    async fn find_audit(
        &self,
        partition: AuditPartition,
        id: &MessageId,
    ) -> crate::Result<Option<MessageRecord>> {
        let _guard = self.transition.read().await;

        Self::read_record(&self.audit_dir(partition).join(id.filename())).await
    }
}

/// Builder for `FileMessageStore`
#[derive(Debug, Default)]
pub struct FileMessageStoreBuilder {
    path: PathBuf,
}

impl FileMessageStoreBuilder {
    /// Set the store root directory
    #[must_use]
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Build the final `FileMessageStore`
    ///
    /// # Errors
    /// Returns an error if the path is invalid or potentially dangerous
    pub fn build(self) -> crate::Result<FileMessageStore> {
        FileMessageStore::validate_path(&self.path)?;
        Ok(FileMessageStore {
            path: self.path,
            transition: Arc::default(),
        })
    }
}
