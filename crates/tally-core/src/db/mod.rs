//! Database layer for Tally

mod connection;
mod conflict_repository;
mod migrations;
mod privacy_repository;
mod queue_repository;
mod session_repository;
mod summary_repository;
mod tracking_repository;

pub use connection::Database;
pub use conflict_repository::{ConflictRepository, SqliteConflictRepository};
pub use privacy_repository::{PrivacyRepository, SqlitePrivacyRepository};
pub use queue_repository::{ClaimOutcome, QueueRepository, SqliteQueueRepository};
pub use session_repository::{SessionRepository, SqliteSessionRepository};
pub use summary_repository::{SqliteSummaryRepository, SummaryRepository};
pub use tracking_repository::{SqliteTrackingRepository, TrackingRepository};
