use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::types::MessageId;

/// Lifecycle state of a message
///
/// `Pending` records live in the pending partition; `Sent` and `Failed` are
/// terminal and only ever found in their audit partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    Pending,
    Sent,
    Failed,
}

impl MessageState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for MessageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two append-only partitions a record ends up in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditPartition {
    Sent,
    Failed,
}

impl AuditPartition {
    /// The partition a record in `state` belongs to, `None` while pending
    #[must_use]
    pub const fn for_state(state: MessageState) -> Option<Self> {
        match state {
            MessageState::Pending => None,
            MessageState::Sent => Some(Self::Sent),
            MessageState::Failed => Some(Self::Failed),
        }
    }

    /// The audit partition for the opposite outcome
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Sent => Self::Failed,
            Self::Failed => Self::Sent,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for AuditPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to deliver a message, as handed to the store or dispatcher
///
/// The identifier and creation time are optional; whichever is missing is
/// assigned when the message is first persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub id: Option<MessageId>,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub created_at: Option<SystemTime>,
}

impl OutboundMessage {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            created_at: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: SystemTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Materialise the request as a fresh pending record
    #[must_use]
    pub fn into_record(self) -> MessageRecord {
        MessageRecord {
            id: self.id.unwrap_or_else(MessageId::generate),
            recipient: self.recipient,
            subject: self.subject,
            body: self.body,
            state: MessageState::Pending,
            created_at: self.created_at.unwrap_or_else(SystemTime::now),
            sent_at: None,
            failed_at: None,
            last_error: None,
            attempts: 0,
            last_attempt_at: None,
        }
    }
}

/// The unit of work: one outbound message and its delivery bookkeeping
///
/// Fields are only changed through the transition methods below, which keep
/// the record consistent: `sent_at` is set iff the state is `Sent`, and a
/// `Failed` record always carries `last_error` and `failed_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    id: MessageId,
    recipient: String,
    subject: String,
    body: String,
    state: MessageState,
    created_at: SystemTime,
    sent_at: Option<SystemTime>,
    failed_at: Option<SystemTime>,
    last_error: Option<String>,
    attempts: u32,
    last_attempt_at: Option<SystemTime>,
}

impl MessageRecord {
    #[must_use]
    pub const fn id(&self) -> &MessageId {
        &self.id
    }

    #[must_use]
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub const fn state(&self) -> MessageState {
        self.state
    }

    #[must_use]
    pub const fn created_at(&self) -> SystemTime {
        self.created_at
    }

    #[must_use]
    pub const fn sent_at(&self) -> Option<SystemTime> {
        self.sent_at
    }

    #[must_use]
    pub const fn failed_at(&self) -> Option<SystemTime> {
        self.failed_at
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub const fn last_attempt_at(&self) -> Option<SystemTime> {
        self.last_attempt_at
    }

    /// Wall-clock time since creation, zero if the clock went backwards
    #[must_use]
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.created_at).unwrap_or_default()
    }

    /// When the record reached its terminal state
    #[must_use]
    pub const fn terminal_at(&self) -> Option<SystemTime> {
        match self.state {
            MessageState::Pending => None,
            MessageState::Sent => self.sent_at,
            MessageState::Failed => self.failed_at,
        }
    }

    /// Record a failed delivery attempt; the record stays pending
    pub fn record_failure(&mut self, error: impl Into<String>, now: SystemTime) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_error = Some(error.into());
        self.last_attempt_at = Some(now);
    }

    /// Transition to `Sent` after a successful delivery attempt
    pub fn mark_sent(&mut self, now: SystemTime) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt_at = Some(now);
        self.state = MessageState::Sent;
        self.sent_at = Some(now);
        self.failed_at = None;
    }

    /// Transition to `Failed`; `reason` becomes the last error
    pub fn mark_failed(&mut self, reason: impl Into<String>, now: SystemTime) {
        self.state = MessageState::Failed;
        self.last_error = Some(reason.into());
        self.failed_at = Some(now);
        self.sent_at = None;
    }

    /// Copy the retry bookkeeping of `other` onto this record
    pub(crate) fn apply_retry_state(&mut self, other: &Self) {
        self.attempts = other.attempts;
        self.last_error.clone_from(&other.last_error);
        self.last_attempt_at = other.last_attempt_at;
    }
}
