//! Daily aggregate recomputation

use crate::db::{
    SessionRepository, SqliteSessionRepository, SqliteSummaryRepository, SummaryRepository,
};
use crate::error::Result;
use crate::models::{DailyTimeSummary, SessionStatus};
use chrono::NaiveDate;
use rusqlite::Connection;

/// Rebuild the summary row for one (member, org, date).
///
/// Always a full recomputation from every closed session and break of the
/// date, not an incremental patch, so partial or conflicting merges cannot
/// leave the aggregate drifting from the session rows.
pub fn recompute_daily_summary(
    conn: &Connection,
    member_id: &str,
    org_id: &str,
    date: NaiveDate,
) -> Result<DailyTimeSummary> {
    let sessions = SqliteSessionRepository::new(conn);
    let summaries = SqliteSummaryRepository::new(conn);

    let worked_minutes: i64 = sessions
        .list_for_date(member_id, org_id, date)?
        .iter()
        .filter(|session| session.status == SessionStatus::Closed)
        .map(|session| session.total_minutes)
        .sum();

    let mut paid_break_minutes = 0;
    let mut unpaid_break_minutes = 0;
    for brk in sessions.breaks_for_date(member_id, org_id, date)? {
        if brk.is_paid {
            paid_break_minutes += brk.total_minutes;
        } else {
            unpaid_break_minutes += brk.total_minutes;
        }
    }

    let scheduled_minutes = summaries.scheduled_minutes(member_id, org_id, date)?;
    let summary = DailyTimeSummary::compute(
        member_id,
        org_id,
        date,
        scheduled_minutes,
        worked_minutes,
        paid_break_minutes,
        unpaid_break_minutes,
    );
    summaries.upsert(&summary)?;

    tracing::debug!(
        member = member_id,
        %date,
        worked = summary.worked_minutes,
        effective = summary.effective_worked_minutes(),
        status = summary.status.as_str(),
        "Recomputed daily summary"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, SqliteSessionRepository};
    use crate::models::{BreakSession, SummaryStatus, TimeSession};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
    }

    fn insert_session(db: &Database, start: (u32, u32), end: (u32, u32), breaks: &[(u32, u32, u32, u32, bool)]) {
        let session = TimeSession::closed(
            "mem-1",
            "org-1",
            Utc.with_ymd_and_hms(2024, 3, 11, start.0, start.1, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 11, end.0, end.1, 0).unwrap(),
            "offline",
        );
        let break_rows: Vec<BreakSession> = breaks
            .iter()
            .map(|&(sh, sm, eh, em, paid)| {
                BreakSession::new(
                    session.id,
                    Utc.with_ymd_and_hms(2024, 3, 11, sh, sm, 0).unwrap(),
                    Utc.with_ymd_and_hms(2024, 3, 11, eh, em, 0).unwrap(),
                    paid,
                )
            })
            .collect();
        SqliteSessionRepository::new(db.connection())
            .insert(&session, &break_rows)
            .unwrap();
    }

    fn seed_scheduled(db: &Database, minutes: i64) {
        let scheduled = DailyTimeSummary::compute("mem-1", "org-1", date(), minutes, 0, 0, 0);
        SqliteSummaryRepository::new(db.connection())
            .upsert(&scheduled)
            .unwrap();
    }

    #[test]
    fn test_short_day_recompute() {
        let db = setup();
        seed_scheduled(&db, 480);
        // Two closed sessions totaling 500 worked minutes, 30 unpaid break
        insert_session(&db, (9, 0), (13, 10), &[(12, 0, 12, 30, false)]);
        insert_session(&db, (14, 0), (18, 10), &[]);

        let summary = recompute_daily_summary(db.connection(), "mem-1", "org-1", date()).unwrap();
        assert_eq!(summary.worked_minutes, 500);
        assert_eq!(summary.unpaid_break_minutes, 30);
        assert_eq!(summary.effective_worked_minutes(), 470);
        assert_eq!(summary.status, SummaryStatus::Short);
        assert_eq!(summary.short_minutes, 10);
    }

    #[test]
    fn test_recompute_replaces_previous_aggregate() {
        let db = setup();
        insert_session(&db, (9, 0), (10, 0), &[]);
        recompute_daily_summary(db.connection(), "mem-1", "org-1", date()).unwrap();

        insert_session(&db, (11, 0), (12, 0), &[(11, 15, 11, 30, true)]);
        let summary = recompute_daily_summary(db.connection(), "mem-1", "org-1", date()).unwrap();

        // Full recompute: both sessions counted exactly once
        assert_eq!(summary.worked_minutes, 120);
        assert_eq!(summary.paid_break_minutes, 15);
        assert_eq!(summary.status, SummaryStatus::Normal);
    }

    #[test]
    fn test_no_sessions_with_schedule_is_absent() {
        let db = setup();
        seed_scheduled(&db, 480);
        let summary = recompute_daily_summary(db.connection(), "mem-1", "org-1", date()).unwrap();
        assert_eq!(summary.status, SummaryStatus::Absent);
        assert_eq!(summary.worked_minutes, 0);
    }
}
