//! Wire-facing batch item payloads.
//!
//! Items are persisted verbatim first and only then deserialized into these
//! shapes by the type processors, so a malformed item never costs the audit
//! trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One offline-recorded work interval with optional breaks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSessionItem {
    /// Interval start
    pub started_at: DateTime<Utc>,
    /// Interval end
    pub ended_at: DateTime<Utc>,
    /// Breaks taken inside the interval
    #[serde(default)]
    pub breaks: Vec<BreakItem>,
    /// Device-local session identifier, echoed in conflict details
    #[serde(default)]
    pub local_session_id: Option<String>,
}

/// One break inside a submitted time session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakItem {
    /// Break start
    pub started_at: DateTime<Utc>,
    /// Break end
    pub ended_at: DateTime<Utc>,
    /// Optional device-supplied label
    #[serde(default)]
    pub label: Option<String>,
    /// Paid flag; defaults to unpaid when the device omits it
    #[serde(default)]
    pub paid: bool,
}

/// One offline-recorded activity sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    /// Sample timestamp
    pub timestamp: DateTime<Utc>,
    /// Foreground application name
    pub app_name: String,
    /// Foreground window title
    pub window_title: String,
    /// Browser URL when applicable
    #[serde(default)]
    pub url: Option<String>,
    /// Activity category when the device classified it
    #[serde(default)]
    pub category: Option<String>,
    /// Whether the member was active at sample time
    pub is_active: bool,
    /// Keyboard activity score for the sample window
    #[serde(default)]
    pub keyboard_activity_score: Option<f64>,
    /// Mouse activity score for the sample window
    #[serde(default)]
    pub mouse_activity_score: Option<f64>,
}

/// One offline-recorded screenshot reference.
///
/// Paths are optional at the wire level: their absence is a `missing_image`
/// conflict, not a deserialization failure. Inline image payloads are never
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotItem {
    /// Capture timestamp
    pub timestamp: DateTime<Utc>,
    /// Object-storage path of the full image
    #[serde(default)]
    pub storage_path: Option<String>,
    /// Object-storage path of the thumbnail
    #[serde(default)]
    pub thumbnail_path: Option<String>,
}

impl ScreenshotItem {
    /// Both storage references present and non-empty
    #[must_use]
    pub fn has_image_references(&self) -> bool {
        fn present(value: Option<&String>) -> bool {
            value.is_some_and(|path| !path.trim().is_empty())
        }
        present(self.storage_path.as_ref()) && present(self.thumbnail_path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_item_defaults() {
        let item: TimeSessionItem = serde_json::from_value(serde_json::json!({
            "started_at": "2024-03-11T09:00:00Z",
            "ended_at": "2024-03-11T12:00:00Z"
        }))
        .unwrap();
        assert!(item.breaks.is_empty());
        assert!(item.local_session_id.is_none());
    }

    #[test]
    fn test_break_defaults_to_unpaid() {
        let brk: BreakItem = serde_json::from_value(serde_json::json!({
            "started_at": "2024-03-11T12:00:00Z",
            "ended_at": "2024-03-11T12:30:00Z"
        }))
        .unwrap();
        assert!(!brk.paid);
    }

    #[test]
    fn test_screenshot_image_references() {
        let mut item: ScreenshotItem = serde_json::from_value(serde_json::json!({
            "timestamp": "2024-03-11T10:00:00Z",
            "storage_path": "shots/a.png",
            "thumbnail_path": "shots/a_thumb.png"
        }))
        .unwrap();
        assert!(item.has_image_references());

        item.thumbnail_path = None;
        assert!(!item.has_image_references());

        item.thumbnail_path = Some("   ".to_string());
        assert!(!item.has_image_references());
    }
}
