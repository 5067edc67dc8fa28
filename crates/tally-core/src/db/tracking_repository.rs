//! Tracking session, activity event, and screenshot repository

use crate::error::{Error, Result};
use crate::models::{ActivityEvent, Screenshot, SessionId, TimeSession, TrackingSession};
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for tracking-window storage operations
pub trait TrackingRepository {
    /// The earliest consent-given tracking session bound to `session`, created
    /// on first use.
    ///
    /// Lookup-or-insert under the unique `time_session_id` guard, so
    /// concurrent activity/screenshot batches for the same time session can
    /// never bind two windows.
    fn get_or_create_for_session(&self, session: &TimeSession) -> Result<TrackingSession>;

    /// Whether an identical event (timestamp, app, window) already exists in
    /// any of the member's tracking sessions
    fn event_exists(
        &self,
        member_id: &str,
        org_id: &str,
        timestamp_ms: i64,
        app_name: &str,
        window_title: &str,
    ) -> Result<bool>;

    /// Insert an activity event; returns the row id
    fn insert_event(&self, event: &ActivityEvent) -> Result<i64>;

    /// Insert a screenshot reference; returns the row id
    fn insert_screenshot(&self, screenshot: &Screenshot) -> Result<i64>;

    /// Number of events bound to a tracking session
    fn event_count(&self, member_id: &str, org_id: &str) -> Result<usize>;

    /// Number of screenshots recorded for a member
    fn screenshot_count(&self, member_id: &str, org_id: &str) -> Result<usize>;
}

/// `SQLite` implementation of `TrackingRepository`
pub struct SqliteTrackingRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteTrackingRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn find_consented(&self, session_id: &SessionId) -> Result<Option<TrackingSession>> {
        let result = self
            .conn
            .query_row(
                "SELECT id, time_session_id, member_id, org_id, started_at, ended_at,
                        consent_given, consent_text
                 FROM tracking_sessions
                 WHERE time_session_id = ? AND consent_given = 1
                 ORDER BY started_at ASC
                 LIMIT 1",
                params![session_id.as_str()],
                Self::parse_tracking,
            )
            .optional()?;
        Ok(result)
    }

    fn parse_tracking(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrackingSession> {
        let id: String = row.get(0)?;
        let session_id: String = row.get(1)?;
        Ok(TrackingSession {
            id: id.parse().unwrap_or_default(),
            time_session_id: session_id.parse().unwrap_or_default(),
            member_id: row.get(2)?,
            org_id: row.get(3)?,
            started_at: row.get(4)?,
            ended_at: row.get(5)?,
            consent_given: row.get::<_, i32>(6)? != 0,
            consent_text: row.get(7)?,
        })
    }
}

impl TrackingRepository for SqliteTrackingRepository<'_> {
    fn get_or_create_for_session(&self, session: &TimeSession) -> Result<TrackingSession> {
        if let Some(existing) = self.find_consented(&session.id)? {
            return Ok(existing);
        }

        let tracking = TrackingSession::offline_replay(
            session.id,
            session.member_id.clone(),
            session.org_id.clone(),
            session.started_at,
            session.ended_at.unwrap_or(session.started_at),
        );

        // The unique index on time_session_id makes this race-safe; a loser
        // re-reads the winner's row
        self.conn.execute(
            "INSERT INTO tracking_sessions
             (id, time_session_id, member_id, org_id, started_at, ended_at,
              consent_given, consent_text)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(time_session_id) DO NOTHING",
            params![
                tracking.id.as_str(),
                tracking.time_session_id.as_str(),
                tracking.member_id,
                tracking.org_id,
                tracking.started_at,
                tracking.ended_at,
                i32::from(tracking.consent_given),
                tracking.consent_text,
            ],
        )?;

        self.find_consented(&session.id)?.ok_or_else(|| {
            Error::Database(format!(
                "tracking session for time session {} exists without consent",
                session.id
            ))
        })
    }

    fn event_exists(
        &self,
        member_id: &str,
        org_id: &str,
        timestamp_ms: i64,
        app_name: &str,
        window_title: &str,
    ) -> Result<bool> {
        let exists: i32 = self.conn.query_row(
            "SELECT EXISTS(
                 SELECT 1 FROM activity_events e
                 JOIN tracking_sessions t ON e.tracking_session_id = t.id
                 WHERE t.member_id = ? AND t.org_id = ?
                   AND e.timestamp = ? AND e.app_name = ? AND e.window_title = ?
             )",
            params![member_id, org_id, timestamp_ms, app_name, window_title],
            |row| row.get(0),
        )?;
        Ok(exists != 0)
    }

    fn insert_event(&self, event: &ActivityEvent) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO activity_events
             (tracking_session_id, timestamp, app_name, window_title, url, category,
              is_active, keyboard_activity_score, mouse_activity_score)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                event.tracking_session_id.as_str(),
                event.timestamp,
                event.app_name,
                event.window_title,
                event.url,
                event.category,
                i32::from(event.is_active),
                event.keyboard_activity_score,
                event.mouse_activity_score,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_screenshot(&self, screenshot: &Screenshot) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO screenshots
             (tracking_session_id, timestamp, storage_path, thumbnail_path, blur_level, is_masked)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                screenshot.tracking_session_id.as_str(),
                screenshot.timestamp,
                screenshot.storage_path,
                screenshot.thumbnail_path,
                screenshot.blur_level,
                i32::from(screenshot.is_masked),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    #[allow(clippy::cast_sign_loss)]
    fn event_count(&self, member_id: &str, org_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM activity_events e
             JOIN tracking_sessions t ON e.tracking_session_id = t.id
             WHERE t.member_id = ? AND t.org_id = ?",
            params![member_id, org_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    #[allow(clippy::cast_sign_loss)]
    fn screenshot_count(&self, member_id: &str, org_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM screenshots s
             JOIN tracking_sessions t ON s.tracking_session_id = t.id
             WHERE t.member_id = ? AND t.org_id = ?",
            params![member_id, org_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
