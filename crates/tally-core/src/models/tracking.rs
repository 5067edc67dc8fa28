//! Tracking session, activity event, and screenshot models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::session::SessionId;

/// Consent text recorded on tracking sessions created during offline replay
pub const OFFLINE_REPLAY_CONSENT: &str = "Offline replay";

/// A unique identifier for a tracking session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackingSessionId(Uuid);

impl TrackingSessionId {
    /// Create a new unique tracking session ID using UUID v7
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

impl Default for TrackingSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackingSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TrackingSessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Consent-scoped window during which activity/screenshots may be recorded.
///
/// Bound to exactly one time session; the engine creates at most one per
/// time session and reuses it for every item inside that session's window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingSession {
    /// Unique identifier
    pub id: TrackingSessionId,
    /// Owning time session
    pub time_session_id: SessionId,
    /// Member being tracked
    pub member_id: String,
    /// Organization scope
    pub org_id: String,
    /// Window start (Unix ms)
    pub started_at: i64,
    /// Window end (Unix ms)
    pub ended_at: i64,
    /// Whether consent was given for this window
    pub consent_given: bool,
    /// Consent text shown/recorded
    pub consent_text: String,
}

impl TrackingSession {
    /// Create a consent-given window spanning the covering time session.
    ///
    /// Offline-recorded activity is treated as pre-consented by the device's
    /// own tracking agreement, not re-prompted.
    #[must_use]
    pub fn offline_replay(
        time_session_id: SessionId,
        member_id: impl Into<String>,
        org_id: impl Into<String>,
        started_at: i64,
        ended_at: i64,
    ) -> Self {
        Self {
            id: TrackingSessionId::new(),
            time_session_id,
            member_id: member_id.into(),
            org_id: org_id.into(),
            started_at,
            ended_at,
            consent_given: true,
            consent_text: OFFLINE_REPLAY_CONSENT.to_string(),
        }
    }
}

/// One foreground activity sample inside a tracking session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Row identifier (0 until persisted)
    pub id: i64,
    /// Owning tracking session
    pub tracking_session_id: TrackingSessionId,
    /// Sample timestamp (Unix ms)
    pub timestamp: i64,
    /// Foreground application name
    pub app_name: String,
    /// Foreground window title
    pub window_title: String,
    /// Browser URL when applicable
    pub url: Option<String>,
    /// Activity category when the device classified it
    pub category: Option<String>,
    /// Whether the member was active at sample time
    pub is_active: bool,
    /// Keyboard activity score for the sample window
    pub keyboard_activity_score: Option<f64>,
    /// Mouse activity score for the sample window
    pub mouse_activity_score: Option<f64>,
}

/// One screenshot reference inside a tracking session.
///
/// Only storage paths are recorded; the engine never touches image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screenshot {
    /// Row identifier (0 until persisted)
    pub id: i64,
    /// Owning tracking session
    pub tracking_session_id: TrackingSessionId,
    /// Capture timestamp (Unix ms)
    pub timestamp: i64,
    /// Object-storage path of the full image
    pub storage_path: String,
    /// Object-storage path of the thumbnail
    pub thumbnail_path: String,
    /// Blur radius applied on render; non-zero when masked
    pub blur_level: i64,
    /// Whether personal-window masking was applied
    pub is_masked: bool,
}
