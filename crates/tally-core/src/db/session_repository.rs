//! Time session and break repository

use crate::error::Result;
use crate::models::{
    BreakSession, SessionId, SessionStatus, TimeSession,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection};

/// Trait for time session and break storage operations
pub trait SessionRepository {
    /// All sessions (open and closed) for a member on a date, oldest first
    fn list_for_date(&self, member_id: &str, org_id: &str, date: NaiveDate)
        -> Result<Vec<TimeSession>>;

    /// Insert a session together with its breaks
    fn insert(&self, session: &TimeSession, breaks: &[BreakSession]) -> Result<()>;

    /// The closed session whose `[start, end)` contains `timestamp_ms`, if any
    fn find_covering(
        &self,
        member_id: &str,
        org_id: &str,
        date: NaiveDate,
        timestamp_ms: i64,
    ) -> Result<Option<TimeSession>>;

    /// Breaks of one session
    fn breaks_for_session(&self, session_id: &SessionId) -> Result<Vec<BreakSession>>;

    /// Breaks of all closed sessions for a member on a date
    fn breaks_for_date(&self, member_id: &str, org_id: &str, date: NaiveDate)
        -> Result<Vec<BreakSession>>;
}

/// `SQLite` implementation of `SessionRepository`
pub struct SqliteSessionRepository<'a> {
    conn: &'a Connection,
}

const SESSION_COLUMNS: &str =
    "id, member_id, org_id, date, started_at, ended_at, status, total_minutes, source";

impl<'a> SqliteSessionRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a time session from a database row
    fn parse_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<TimeSession> {
        let id: String = row.get(0)?;
        let date: String = row.get(3)?;
        let status: String = row.get(6)?;
        Ok(TimeSession {
            id: id.parse().unwrap_or_default(),
            member_id: row.get(1)?,
            org_id: row.get(2)?,
            date: date.parse().unwrap_or_default(),
            started_at: row.get(4)?,
            ended_at: row.get(5)?,
            status: SessionStatus::parse(&status).unwrap_or(SessionStatus::Closed),
            total_minutes: row.get(7)?,
            source: row.get(8)?,
        })
    }

    /// Parse a break session from a database row
    fn parse_break(row: &rusqlite::Row<'_>) -> rusqlite::Result<BreakSession> {
        let id: String = row.get(0)?;
        let session_id: String = row.get(1)?;
        Ok(BreakSession {
            id: id.parse().unwrap_or_default(),
            time_session_id: session_id.parse().unwrap_or_default(),
            started_at: row.get(2)?,
            ended_at: row.get(3)?,
            total_minutes: row.get(4)?,
            is_paid: row.get::<_, i32>(5)? != 0,
        })
    }
}

impl SessionRepository for SqliteSessionRepository<'_> {
    fn list_for_date(
        &self,
        member_id: &str,
        org_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<TimeSession>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM time_sessions
             WHERE member_id = ? AND org_id = ? AND date = ?
             ORDER BY started_at ASC"
        ))?;

        let sessions = stmt
            .query_map(
                params![member_id, org_id, date.to_string()],
                Self::parse_session,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(sessions)
    }

    fn insert(&self, session: &TimeSession, breaks: &[BreakSession]) -> Result<()> {
        self.conn.execute(
            "INSERT INTO time_sessions
             (id, member_id, org_id, date, started_at, ended_at, status, total_minutes, source)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                session.id.as_str(),
                session.member_id,
                session.org_id,
                session.date.to_string(),
                session.started_at,
                session.ended_at,
                session.status.as_str(),
                session.total_minutes,
                session.source,
            ],
        )?;

        for brk in breaks {
            self.conn.execute(
                "INSERT INTO break_sessions
                 (id, time_session_id, started_at, ended_at, total_minutes, is_paid)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    brk.id.as_str(),
                    brk.time_session_id.as_str(),
                    brk.started_at,
                    brk.ended_at,
                    brk.total_minutes,
                    i32::from(brk.is_paid),
                ],
            )?;
        }

        Ok(())
    }

    fn find_covering(
        &self,
        member_id: &str,
        org_id: &str,
        date: NaiveDate,
        timestamp_ms: i64,
    ) -> Result<Option<TimeSession>> {
        let result = self.conn.query_row(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM time_sessions
                 WHERE member_id = ? AND org_id = ? AND date = ?
                   AND ended_at IS NOT NULL
                   AND started_at <= ? AND ? < ended_at
                 ORDER BY started_at ASC
                 LIMIT 1"
            ),
            params![member_id, org_id, date.to_string(), timestamp_ms, timestamp_ms],
            Self::parse_session,
        );

        match result {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn breaks_for_session(&self, session_id: &SessionId) -> Result<Vec<BreakSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, time_session_id, started_at, ended_at, total_minutes, is_paid
             FROM break_sessions WHERE time_session_id = ?
             ORDER BY started_at ASC",
        )?;

        let breaks = stmt
            .query_map(params![session_id.as_str()], Self::parse_break)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(breaks)
    }

    fn breaks_for_date(
        &self,
        member_id: &str,
        org_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<BreakSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.time_session_id, b.started_at, b.ended_at, b.total_minutes, b.is_paid
             FROM break_sessions b
             JOIN time_sessions s ON b.time_session_id = s.id
             WHERE s.member_id = ? AND s.org_id = ? AND s.date = ? AND s.status = 'closed'
             ORDER BY b.started_at ASC",
        )?;

        let breaks = stmt
            .query_map(params![member_id, org_id, date.to_string()], Self::parse_break)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(breaks)
    }
}
