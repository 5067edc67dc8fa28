//! Time-session batch processing

use crate::db::{SessionRepository, SqliteSessionRepository};
use crate::error::Result;
use crate::models::{BreakSession, ConflictType, TimeSession, TimeSessionItem};
use rusqlite::Connection;
use std::collections::BTreeSet;

use super::summary::recompute_daily_summary;
use super::{record_conflict, BatchContext, ConflictRef, SyncTunables};

/// Source tag stamped on sessions merged from offline batches
pub const OFFLINE_SOURCE: &str = "offline";

/// Apply one batch of offline time sessions.
///
/// Every item's date is recomputed afterwards regardless of whether the item
/// was inserted or flagged, so the aggregate stays consistent with whatever
/// the batch actually changed.
pub(crate) fn process_time_items(
    conn: &Connection,
    tunables: &SyncTunables,
    ctx: &BatchContext<'_>,
    items: &[TimeSessionItem],
) -> Result<Vec<ConflictRef>> {
    let sessions = SqliteSessionRepository::new(conn);
    let mut conflicts = Vec::new();
    let mut touched_dates = BTreeSet::new();

    for item in items {
        let date = item.started_at.date_naive();
        touched_dates.insert(date);

        let start_ms = item.started_at.timestamp_millis();
        let end_ms = item.ended_at.timestamp_millis();

        // Reload per item so later items in the same batch are checked
        // against earlier inserts
        let existing = sessions.list_for_date(ctx.member_id, ctx.org_id, date)?;

        if let Some(duplicate) = existing
            .iter()
            .find(|session| is_duplicate(session, start_ms, end_ms, tunables.duplicate_window_ms))
        {
            conflicts.push(record_conflict(
                conn,
                ctx,
                ConflictType::DuplicateTimeSession,
                &serde_json::json!({
                    "existing_session_id": duplicate.id.as_str(),
                    "local_session_id": item.local_session_id,
                    "started_at": item.started_at,
                    "ended_at": item.ended_at,
                }),
            )?);
            continue;
        }

        if let Some(overlapping) = existing
            .iter()
            .find(|session| overlaps(session, start_ms, end_ms))
        {
            conflicts.push(record_conflict(
                conn,
                ctx,
                ConflictType::OverlappingTimeSession,
                &serde_json::json!({
                    "overlapping_session_id": overlapping.id.as_str(),
                    "local_session_id": item.local_session_id,
                    "incoming_started_at": item.started_at,
                    "incoming_ended_at": item.ended_at,
                }),
            )?);
            continue;
        }

        let session = TimeSession::closed(
            ctx.member_id,
            ctx.org_id,
            item.started_at,
            item.ended_at,
            OFFLINE_SOURCE,
        );
        let breaks: Vec<BreakSession> = item
            .breaks
            .iter()
            .map(|brk| BreakSession::new(session.id, brk.started_at, brk.ended_at, brk.paid))
            .collect();
        sessions.insert(&session, &breaks)?;

        tracing::debug!(
            member = ctx.member_id,
            session = %session.id,
            minutes = session.total_minutes,
            breaks = breaks.len(),
            "Merged offline time session"
        );
    }

    for date in touched_dates {
        recompute_daily_summary(conn, ctx.member_id, ctx.org_id, date)?;
    }

    Ok(conflicts)
}

/// Start and end both within the duplicate window of the existing session.
///
/// Open sessions have no end to compare against, so they can only conflict
/// via overlap.
fn is_duplicate(session: &TimeSession, start_ms: i64, end_ms: i64, window_ms: i64) -> bool {
    let Some(existing_end) = session.ended_at else {
        return false;
    };
    (session.started_at - start_ms).abs() <= window_ms
        && (existing_end - end_ms).abs() <= window_ms
}

/// Half-open interval overlap; an open session is treated as unbounded
/// (still running "now")
fn overlaps(session: &TimeSession, start_ms: i64, end_ms: i64) -> bool {
    session.started_at < end_ms && session.ended_at.map_or(true, |end| start_ms < end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, SqliteSummaryRepository, SummaryRepository};
    use crate::models::{BreakItem, SessionStatus};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn ctx() -> BatchContext<'static> {
        BatchContext {
            device_id: "dev-1",
            member_id: "mem-1",
            org_id: "org-1",
        }
    }

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 11, h, m, s).unwrap()
    }

    fn item(start: DateTime<Utc>, end: DateTime<Utc>) -> TimeSessionItem {
        TimeSessionItem {
            started_at: start,
            ended_at: end,
            breaks: Vec::new(),
            local_session_id: Some("local-1".to_string()),
        }
    }

    fn process(db: &Database, items: &[TimeSessionItem]) -> Vec<ConflictRef> {
        process_time_items(db.connection(), &SyncTunables::default(), &ctx(), items).unwrap()
    }

    fn sessions_on(db: &Database) -> Vec<TimeSession> {
        SqliteSessionRepository::new(db.connection())
            .list_for_date("mem-1", "org-1", NaiveDate::from_ymd_opt(2024, 3, 11).unwrap())
            .unwrap()
    }

    #[test]
    fn test_clean_insert_with_breaks() {
        let db = setup();
        let mut work = item(ts(9, 0, 0), ts(12, 0, 0));
        work.breaks.push(BreakItem {
            started_at: ts(10, 0, 0),
            ended_at: ts(10, 15, 0),
            label: Some("coffee".to_string()),
            paid: false,
        });

        let conflicts = process(&db, &[work]);
        assert!(conflicts.is_empty());

        let sessions = sessions_on(&db);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, SessionStatus::Closed);
        assert_eq!(sessions[0].total_minutes, 180);
        assert_eq!(sessions[0].source, OFFLINE_SOURCE);

        let breaks = SqliteSessionRepository::new(db.connection())
            .breaks_for_session(&sessions[0].id)
            .unwrap();
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].total_minutes, 15);
        assert!(!breaks[0].is_paid);
    }

    #[test]
    fn test_duplicate_within_two_seconds() {
        let db = setup();
        process(&db, &[item(ts(9, 0, 0), ts(12, 0, 0))]);

        let conflicts = process(&db, &[item(ts(9, 0, 2), ts(11, 59, 58))]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::DuplicateTimeSession);
        assert_eq!(sessions_on(&db).len(), 1);
    }

    #[test]
    fn test_near_match_outside_window_is_overlap() {
        let db = setup();
        process(&db, &[item(ts(9, 0, 0), ts(12, 0, 0))]);

        // Start differs by 3 seconds: not a duplicate, but it overlaps
        let conflicts = process(&db, &[item(ts(9, 0, 3), ts(12, 0, 0))]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(
            conflicts[0].conflict_type,
            ConflictType::OverlappingTimeSession
        );
        assert_eq!(sessions_on(&db).len(), 1);
    }

    #[test]
    fn test_overlap_within_one_batch() {
        let db = setup();
        let conflicts = process(
            &db,
            &[
                item(ts(9, 0, 0), ts(12, 0, 0)),
                item(ts(11, 30, 0), ts(13, 0, 0)),
            ],
        );
        assert_eq!(conflicts.len(), 1);
        assert_eq!(
            conflicts[0].conflict_type,
            ConflictType::OverlappingTimeSession
        );
        assert_eq!(sessions_on(&db).len(), 1);
    }

    #[test]
    fn test_open_session_overlaps_unbounded() {
        let db = setup();
        let sessions = SqliteSessionRepository::new(db.connection());
        let mut open = TimeSession::closed("mem-1", "org-1", ts(9, 0, 0), ts(9, 30, 0), "web");
        open.ended_at = None;
        open.status = SessionStatus::Open;
        open.total_minutes = 0;
        sessions.insert(&open, &[]).unwrap();

        // Starts hours after the open session started; still overlapping
        let conflicts = process(&db, &[item(ts(15, 0, 0), ts(16, 0, 0))]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(
            conflicts[0].conflict_type,
            ConflictType::OverlappingTimeSession
        );
    }

    #[test]
    fn test_adjacent_sessions_do_not_overlap() {
        let db = setup();
        let conflicts = process(
            &db,
            &[
                item(ts(9, 0, 0), ts(12, 0, 0)),
                item(ts(12, 0, 0), ts(13, 0, 0)),
            ],
        );
        assert!(conflicts.is_empty());
        assert_eq!(sessions_on(&db).len(), 2);
    }

    #[test]
    fn test_touched_dates_are_recomputed() {
        let db = setup();
        process(&db, &[item(ts(9, 0, 0), ts(12, 0, 0))]);

        let summary = SqliteSummaryRepository::new(db.connection())
            .load(
                "mem-1",
                "org-1",
                NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(summary.worked_minutes, 180);
    }

    #[test]
    fn test_conflicting_item_still_recomputes_its_date() {
        let db = setup();
        process(&db, &[item(ts(9, 0, 0), ts(12, 0, 0))]);

        // Manually wreck the summary, then submit a batch that only conflicts
        let stale = crate::models::DailyTimeSummary::compute(
            "mem-1",
            "org-1",
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            0,
            0,
            0,
            0,
        );
        SqliteSummaryRepository::new(db.connection())
            .upsert(&stale)
            .unwrap();

        process(&db, &[item(ts(9, 0, 0), ts(12, 0, 0))]);
        let summary = SqliteSummaryRepository::new(db.connection())
            .load(
                "mem-1",
                "org-1",
                NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(summary.worked_minutes, 180);
    }
}
