//! Time session and break models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a time session, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new unique session ID using UUID v7
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

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A unique identifier for a break session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BreakId(Uuid);

impl BreakId {
    /// Create a new unique break ID using UUID v7
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

impl Default for BreakId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BreakId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BreakId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Whether a session is still running or finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No end time yet; still running
    Open,
    /// Finished; `total_minutes` is set
    Closed,
}

impl SessionStatus {
    /// Database representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    /// Parse the database representation
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// A work interval for a member on a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSession {
    /// Unique identifier
    pub id: SessionId,
    /// Member working the interval
    pub member_id: String,
    /// Organization scope
    pub org_id: String,
    /// Calendar date derived from the start time (UTC)
    pub date: NaiveDate,
    /// Interval start (Unix ms)
    pub started_at: i64,
    /// Interval end (Unix ms); `None` while still running
    pub ended_at: Option<i64>,
    /// Open or closed
    pub status: SessionStatus,
    /// Rounded minutes between end and start, floored at zero; 0 while open
    pub total_minutes: i64,
    /// Origin of the record (e.g., "offline")
    pub source: String,
}

impl TimeSession {
    /// Create a closed session from an offline-recorded interval.
    ///
    /// The date is the UTC calendar date of the start; total minutes is the
    /// rounded minute difference between end and start, floored at zero.
    #[must_use]
    pub fn closed(
        member_id: impl Into<String>,
        org_id: impl Into<String>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        source: impl Into<String>,
    ) -> Self {
        let start_ms = started_at.timestamp_millis();
        let end_ms = ended_at.timestamp_millis();
        Self {
            id: SessionId::new(),
            member_id: member_id.into(),
            org_id: org_id.into(),
            date: started_at.date_naive(),
            started_at: start_ms,
            ended_at: Some(end_ms),
            status: SessionStatus::Closed,
            total_minutes: rounded_minutes(start_ms, end_ms),
            source: source.into(),
        }
    }

    /// Whether `timestamp_ms` falls inside the half-open `[start, end)` interval.
    ///
    /// Open sessions never cover: their true end is unknown.
    #[must_use]
    pub fn covers(&self, timestamp_ms: i64) -> bool {
        match self.ended_at {
            Some(end) => self.started_at <= timestamp_ms && timestamp_ms < end,
            None => false,
        }
    }
}

/// A break inside exactly one time session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakSession {
    /// Unique identifier
    pub id: BreakId,
    /// Owning time session
    pub time_session_id: SessionId,
    /// Break start (Unix ms)
    pub started_at: i64,
    /// Break end (Unix ms)
    pub ended_at: i64,
    /// Rounded minutes between end and start, floored at zero
    pub total_minutes: i64,
    /// Whether the break counts as paid time
    pub is_paid: bool,
}

impl BreakSession {
    /// Create a break tied to `time_session_id`
    #[must_use]
    pub fn new(
        time_session_id: SessionId,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        is_paid: bool,
    ) -> Self {
        let start_ms = started_at.timestamp_millis();
        let end_ms = ended_at.timestamp_millis();
        Self {
            id: BreakId::new(),
            time_session_id,
            started_at: start_ms,
            ended_at: end_ms,
            total_minutes: rounded_minutes(start_ms, end_ms),
            is_paid,
        }
    }
}

/// Rounded minute difference between two Unix-ms timestamps, floored at zero
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn rounded_minutes(start_ms: i64, end_ms: i64) -> i64 {
    let minutes = ((end_ms - start_ms) as f64 / 60_000.0).round() as i64;
    minutes.max(0)
}
