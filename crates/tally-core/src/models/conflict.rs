//! Sync conflict model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of anomaly detected while merging offline records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Incoming time session matches an existing one within the duplicate window
    DuplicateTimeSession,
    /// Incoming time session overlaps an existing interval
    OverlappingTimeSession,
    /// Member privacy settings do not allow this kind of record
    PrivacyBlocked,
    /// No closed time session covers the record's timestamp
    NoTimeSession,
    /// Identical activity event already recorded
    DuplicateEvent,
    /// Screenshot submitted without storage/thumbnail references
    MissingImage,
}

impl ConflictType {
    /// Database/wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateTimeSession => "duplicate_time_session",
            Self::OverlappingTimeSession => "overlapping_time_session",
            Self::PrivacyBlocked => "privacy_blocked",
            Self::NoTimeSession => "no_time_session",
            Self::DuplicateEvent => "duplicate_event",
            Self::MissingImage => "missing_image",
        }
    }

    /// Parse the database representation
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "duplicate_time_session" => Some(Self::DuplicateTimeSession),
            "overlapping_time_session" => Some(Self::OverlappingTimeSession),
            "privacy_blocked" => Some(Self::PrivacyBlocked),
            "no_time_session" => Some(Self::NoTimeSession),
            "duplicate_event" => Some(Self::DuplicateEvent),
            "missing_image" => Some(Self::MissingImage),
            _ => None,
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded anomaly, append-only; resolution is an external administrative action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Conflict row identifier
    pub id: i64,
    /// Device that submitted the conflicting record
    pub device_id: String,
    /// Member the record belongs to
    pub member_id: String,
    /// Organization scope
    pub org_id: String,
    /// Kind of anomaly
    pub conflict_type: ConflictType,
    /// Free-form JSON details for administrative review
    pub details: String,
    /// Detection timestamp (Unix ms)
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_type_round_trip() {
        for conflict_type in [
            ConflictType::DuplicateTimeSession,
            ConflictType::OverlappingTimeSession,
            ConflictType::PrivacyBlocked,
            ConflictType::NoTimeSession,
            ConflictType::DuplicateEvent,
            ConflictType::MissingImage,
        ] {
            assert_eq!(ConflictType::parse(conflict_type.as_str()), Some(conflict_type));
        }
        assert_eq!(ConflictType::parse("unknown"), None);
    }

    #[test]
    fn test_conflict_type_serde_matches_as_str() {
        let json = serde_json::to_string(&ConflictType::PrivacyBlocked).unwrap();
        assert_eq!(json, "\"privacy_blocked\"");
    }
}
