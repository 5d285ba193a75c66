//! Notification records and the append-only history they are stored in.
//!
//! The lifecycle of a record is:
//!
//! ```text
//! NotificationRecord::pending() ──► Pending
//!          mark_sent()          ──► Sent    (terminal)
//!          mark_failed()        ──► Failed  (terminal)
//! ```
//!
//! A terminal record is appended to a [`HistoryStore`] and never mutated again.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HistoryResult;

/// Delivery status of a [`NotificationRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Created, delivery not finished yet.
    Pending,
    /// Delivered successfully.
    Sent,
    /// Delivery failed after all attempts.
    Failed,
}

impl NotificationStatus {
    /// Returns the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for `Sent` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One attempt to notify one recipient through one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    id: Uuid,
    recipient_id: String,
    channel: String,
    content: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    status: NotificationStatus,
    attempts: u32,
    error: Option<String>,
}

impl NotificationRecord {
    /// Creates a new pending record with a fresh id.
    pub fn pending(
        recipient_id: impl Into<String>,
        channel: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id: recipient_id.into(),
            channel: channel.into(),
            content: content.into(),
            created_at: Utc::now(),
            completed_at: None,
            status: NotificationStatus::Pending,
            attempts: 0,
            error: None,
        }
    }

    /// Transitions `Pending → Sent`.
    ///
    /// Returns `false` and leaves the record unchanged if it is already terminal.
    pub fn mark_sent(&mut self, attempts: u32) -> bool {
        self.complete(NotificationStatus::Sent, attempts, None)
    }

    /// Transitions `Pending → Failed`, keeping the last error message.
    ///
    /// Returns `false` and leaves the record unchanged if it is already terminal.
    pub fn mark_failed(&mut self, attempts: u32, error: impl Into<String>) -> bool {
        self.complete(NotificationStatus::Failed, attempts, Some(error.into()))
    }

    fn complete(&mut self, status: NotificationStatus, attempts: u32, error: Option<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.attempts = attempts;
        self.error = error;
        self.completed_at = Some(Utc::now());
        true
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient_id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn status(&self) -> NotificationStatus {
        self.status
    }

    /// Number of delivery attempts made before the record became terminal.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The last delivery error, for failed records.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

// =============================================================================
// HistoryStore
// =============================================================================

/// Append-only store of terminal notification records.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends `record` to the history of its recipient.
    async fn append(&self, record: NotificationRecord) -> HistoryResult<()>;

    /// Returns the records of `recipient_id` in insertion order.
    async fn for_recipient(&self, recipient_id: &str) -> HistoryResult<Vec<NotificationRecord>>;
}

/// Process-local [`HistoryStore`].
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    records: RwLock<HashMap<String, Vec<NotificationRecord>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records across all recipients.
    pub fn len(&self) -> usize {
        self.records.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn append(&self, record: NotificationRecord) -> HistoryResult<()> {
        self.records
            .write()
            .entry(record.recipient_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn for_recipient(&self, recipient_id: &str) -> HistoryResult<Vec<NotificationRecord>> {
        Ok(self
            .records
            .read()
            .get(recipient_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_once() {
        let mut record = NotificationRecord::pending("u1", "email", "hello");
        assert_eq!(record.status(), NotificationStatus::Pending);

        assert!(record.mark_sent(1));
        assert!(!record.mark_failed(2, "late failure"));

        assert_eq!(record.status(), NotificationStatus::Sent);
        assert_eq!(record.attempts(), 1);
        assert!(record.error().is_none());
        assert!(record.completed_at().is_some());
    }

    #[test]
    fn failed_record_keeps_error() {
        let mut record = NotificationRecord::pending("u1", "sms", "hello");
        record.mark_failed(3, "gateway down");
        assert_eq!(record.status(), NotificationStatus::Failed);
        assert_eq!(record.error(), Some("gateway down"));
    }

    #[tokio::test]
    async fn history_preserves_insertion_order_per_recipient() {
        let history = InMemoryHistory::new();
        for channel in ["email", "sms", "push"] {
            let mut r = NotificationRecord::pending("u1", channel, "x");
            r.mark_sent(1);
            history.append(r).await.unwrap();
        }
        let mut other = NotificationRecord::pending("u2", "email", "x");
        other.mark_sent(1);
        history.append(other).await.unwrap();

        let channels: Vec<_> = history
            .for_recipient("u1")
            .await
            .unwrap()
            .iter()
            .map(|r| r.channel().to_string())
            .collect();
        assert_eq!(channels, ["email", "sms", "push"]);
        assert_eq!(history.len(), 4);
        assert!(history.for_recipient("nobody").await.unwrap().is_empty());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&NotificationStatus::Failed).unwrap();
        assert_eq!(json, "\"failed\"");
    }
}
