//! Data models for Tally

mod conflict;
mod items;
mod privacy;
mod queue;
mod session;
mod summary;
mod tracking;

pub use conflict::{ConflictType, SyncConflict};
pub use items::{ActivityItem, BreakItem, ScreenshotItem, TimeSessionItem};
pub use privacy::MemberPrivacySettings;
pub use queue::{BatchType, QueueEntryId, QueueStatus, SyncItem, SyncQueueEntry};
pub use session::{
    rounded_minutes, BreakId, BreakSession, SessionId, SessionStatus, TimeSession,
};
pub use summary::{DailyTimeSummary, SummaryStatus};
pub use tracking::{
    ActivityEvent, Screenshot, TrackingSession, TrackingSessionId, OFFLINE_REPLAY_CONSENT,
};
