//! Daily time summary repository

use crate::error::Result;
use crate::models::{DailyTimeSummary, SummaryStatus};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for daily summary storage operations
pub trait SummaryRepository {
    /// Scheduled minutes for a day; 0 when no summary row exists yet.
    ///
    /// Scheduling owns this value, the engine only reads it back.
    fn scheduled_minutes(&self, member_id: &str, org_id: &str, date: NaiveDate) -> Result<i64>;

    /// Upsert a recomputed summary. Never overwrites scheduled minutes.
    fn upsert(&self, summary: &DailyTimeSummary) -> Result<()>;

    /// Load the summary row for a day, if present
    fn load(&self, member_id: &str, org_id: &str, date: NaiveDate)
        -> Result<Option<DailyTimeSummary>>;
}

/// `SQLite` implementation of `SummaryRepository`
pub struct SqliteSummaryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSummaryRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SummaryRepository for SqliteSummaryRepository<'_> {
    fn scheduled_minutes(&self, member_id: &str, org_id: &str, date: NaiveDate) -> Result<i64> {
        let scheduled = self
            .conn
            .query_row(
                "SELECT scheduled_minutes FROM daily_time_summaries
                 WHERE member_id = ? AND org_id = ? AND date = ?",
                params![member_id, org_id, date.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(scheduled.unwrap_or(0))
    }

    fn upsert(&self, summary: &DailyTimeSummary) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT INTO daily_time_summaries
             (member_id, org_id, date, scheduled_minutes, worked_minutes,
              paid_break_minutes, unpaid_break_minutes, extra_minutes, short_minutes,
              status, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(member_id, org_id, date) DO UPDATE SET
                 worked_minutes = excluded.worked_minutes,
                 paid_break_minutes = excluded.paid_break_minutes,
                 unpaid_break_minutes = excluded.unpaid_break_minutes,
                 extra_minutes = excluded.extra_minutes,
                 short_minutes = excluded.short_minutes,
                 status = excluded.status,
                 updated_at = excluded.updated_at",
            params![
                summary.member_id,
                summary.org_id,
                summary.date.to_string(),
                summary.scheduled_minutes,
                summary.worked_minutes,
                summary.paid_break_minutes,
                summary.unpaid_break_minutes,
                summary.extra_minutes,
                summary.short_minutes,
                summary.status.as_str(),
                now,
            ],
        )?;
        Ok(())
    }

    fn load(
        &self,
        member_id: &str,
        org_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyTimeSummary>> {
        let summary = self
            .conn
            .query_row(
                "SELECT member_id, org_id, date, scheduled_minutes, worked_minutes,
                        paid_break_minutes, unpaid_break_minutes, extra_minutes,
                        short_minutes, status
                 FROM daily_time_summaries
                 WHERE member_id = ? AND org_id = ? AND date = ?",
                params![member_id, org_id, date.to_string()],
                |row| {
                    let date: String = row.get(2)?;
                    let status: String = row.get(9)?;
                    Ok(DailyTimeSummary {
                        member_id: row.get(0)?,
                        org_id: row.get(1)?,
                        date: date.parse().unwrap_or_default(),
                        scheduled_minutes: row.get(3)?,
                        worked_minutes: row.get(4)?,
                        paid_break_minutes: row.get(5)?,
                        unpaid_break_minutes: row.get(6)?,
                        extra_minutes: row.get(7)?,
                        short_minutes: row.get(8)?,
                        status: SummaryStatus::parse(&status).unwrap_or(SummaryStatus::Normal),
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }
}
