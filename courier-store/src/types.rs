use std::str::FromStr;

/// Identifier for a stored message
///
/// A ULID: globally unique, immutable once assigned, and lexicographically
/// sortable by generation time. It doubles as the on-disk file stem for the
/// file-backed store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId {
    id: ulid::Ulid,
}

impl MessageId {
    /// Parse a message ID from a record filename like `01ARYZ6S41.bin`
    ///
    /// # Security
    /// This function explicitly rejects:
    /// - Path separators (/ and \)
    /// - Directory traversal patterns (..)
    /// - Invalid ULID format
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.contains('/') || filename.contains('\\') {
            return None;
        }

        if filename.contains("..") {
            return None;
        }

        let stem = filename.strip_suffix(".bin")?;
        let id = ulid::Ulid::from_string(stem).ok()?;

        Some(Self { id })
    }

    /// Create a new message ID from a ULID
    #[must_use]
    pub const fn new(id: ulid::Ulid) -> Self {
        Self { id }
    }

    /// Generate a new unique message ID
    #[must_use]
    pub fn generate() -> Self {
        Self {
            id: ulid::Ulid::new(),
        }
    }

    /// Get the underlying ULID
    #[must_use]
    pub const fn ulid(&self) -> ulid::Ulid {
        self.id
    }

    /// The file name this record is stored under
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}.bin", self.id)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl FromStr for MessageId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s.trim()).map(Self::new)
    }
}

impl serde::Serialize for MessageId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.id.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for MessageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let id = ulid::Ulid::from_string(&s).map_err(serde::de::Error::custom)?;
        Ok(Self { id })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_filename_validation() {
        assert!(MessageId::from_filename("01ARZ3NDEKTSV4RRFFQ69G5FAV.bin").is_some());

        // Security
        assert!(MessageId::from_filename("../etc/passwd.bin").is_none());
        assert!(MessageId::from_filename("foo/bar.bin").is_none());
        assert!(MessageId::from_filename("..\\windows\\system32.bin").is_none());

        // Format
        assert!(MessageId::from_filename("not_a_valid_ulid.bin").is_none());
        assert!(MessageId::from_filename("1234567890.bin").is_none());
        assert!(MessageId::from_filename(".tmp_01ARZ3NDEKTSV4RRFFQ69G5FAV.bin").is_none());
        assert!(MessageId::from_filename("01ARZ3NDEKTSV4RRFFQ69G5FAV.eml").is_none());
    }

    #[test]
    fn test_filename_round_trips() {
        let id = MessageId::generate();
        assert_eq!(MessageId::from_filename(&id.filename()), Some(id));
    }

    #[test]
    fn test_parse_from_str() {
        let id: MessageId = " 01ARZ3NDEKTSV4RRFFQ69G5FAV ".parse().expect("valid ulid");
        assert_eq!(id.to_string(), "01ARZ3NDEKTSV4RRFFQ69G5FAV");
        assert!("definitely-not".parse::<MessageId>().is_err());
    }

    #[test]
    fn test_generated_ids_sort_by_creation() {
        let first = MessageId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = MessageId::generate();
        assert!(first < second);
    }
}
