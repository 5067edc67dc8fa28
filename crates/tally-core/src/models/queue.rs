//! Sync queue entry and raw item models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a sync queue entry, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueEntryId(Uuid);

impl QueueEntryId {
    /// Create a new unique queue entry ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for QueueEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueueEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueEntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Kind of records carried by a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchType {
    /// Time sessions with optional breaks
    Time,
    /// Foreground app activity samples
    Activity,
    /// Screenshot references (paths only, never bytes)
    Screenshot,
}

impl BatchType {
    /// Database/wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Activity => "activity",
            Self::Screenshot => "screenshot",
        }
    }

    /// Parse the database/wire representation
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "time" => Some(Self::Time),
            "activity" => Some(Self::Activity),
            "screenshot" => Some(Self::Screenshot),
            _ => None,
        }
    }
}

impl fmt::Display for BatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a queue entry: pending on intake, then exactly one terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Intake recorded, processing not yet finished
    Pending,
    /// All items dispatched; conflicts (if any) recorded
    Applied,
    /// Processing aborted; `error_message` holds the cause
    Error,
}

impl QueueStatus {
    /// Database representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::Error => "error",
        }
    }

    /// Parse the database representation
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "applied" => Some(Self::Applied),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One submitted batch, keyed by the (device, member, local batch id) triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncQueueEntry {
    /// Unique identifier
    pub id: QueueEntryId,
    /// Submitting device
    pub device_id: String,
    /// Member the records belong to
    pub member_id: String,
    /// Organization scope
    pub org_id: String,
    /// Caller-generated id, unique per device+member (idempotency key)
    pub local_batch_id: String,
    /// Kind of records in the batch
    pub batch_type: BatchType,
    /// Number of items submitted
    pub item_count: usize,
    /// Current lifecycle state
    pub status: QueueStatus,
    /// Intake timestamp (Unix ms)
    pub received_at: i64,
    /// Terminal-transition timestamp (Unix ms)
    pub processed_at: Option<i64>,
    /// Failure detail when status is `Error`
    pub error_message: Option<String>,
}

impl SyncQueueEntry {
    /// Create a pending entry for a freshly accepted batch
    #[must_use]
    pub fn pending(
        device_id: impl Into<String>,
        member_id: impl Into<String>,
        org_id: impl Into<String>,
        local_batch_id: impl Into<String>,
        batch_type: BatchType,
        item_count: usize,
    ) -> Self {
        Self {
            id: QueueEntryId::new(),
            device_id: device_id.into(),
            member_id: member_id.into(),
            org_id: org_id.into(),
            local_batch_id: local_batch_id.into(),
            batch_type,
            item_count,
            status: QueueStatus::Pending,
            received_at: chrono::Utc::now().timestamp_millis(),
            processed_at: None,
            error_message: None,
        }
    }
}

/// One raw record within a queue entry, kept verbatim for audit/replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncItem {
    /// Owning queue entry
    pub queue_entry_id: QueueEntryId,
    /// Zero-based position within the batch
    pub item_index: usize,
    /// Payload-type tag (the batch type at submission)
    pub payload_type: BatchType,
    /// Untouched JSON payload as submitted by the device
    pub payload: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_entry_id_unique() {
        let id1 = QueueEntryId::new();
        let id2 = QueueEntryId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_queue_entry_id_parse() {
        let id = QueueEntryId::new();
        let parsed: QueueEntryId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_batch_type_round_trip() {
        for batch_type in [BatchType::Time, BatchType::Activity, BatchType::Screenshot] {
            assert_eq!(BatchType::parse(batch_type.as_str()), Some(batch_type));
        }
        assert_eq!(BatchType::parse("bogus"), None);
    }

    #[test]
    fn test_queue_status_round_trip() {
        for status in [QueueStatus::Pending, QueueStatus::Applied, QueueStatus::Error] {
            assert_eq!(QueueStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(QueueStatus::parse(""), None);
    }

    #[test]
    fn test_pending_entry() {
        let entry = SyncQueueEntry::pending("dev-1", "mem-1", "org-1", "batch-1", BatchType::Time, 3);
        assert_eq!(entry.status, QueueStatus::Pending);
        assert_eq!(entry.item_count, 3);
        assert!(entry.received_at > 0);
        assert!(entry.processed_at.is_none());
        assert!(entry.error_message.is_none());
    }
}
