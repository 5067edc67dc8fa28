//! Activity-event and screenshot batch processing

use crate::db::{
    PrivacyRepository, SessionRepository, SqlitePrivacyRepository, SqliteSessionRepository,
    SqliteTrackingRepository, TrackingRepository,
};
use crate::error::Result;
use crate::models::{
    ActivityEvent, ActivityItem, ConflictType, MemberPrivacySettings, Screenshot, ScreenshotItem,
    TimeSession,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use super::{record_conflict, BatchContext, ConflictRef, SyncTunables};

/// Apply one batch of offline activity events
pub(crate) fn process_activity_items(
    conn: &Connection,
    ctx: &BatchContext<'_>,
    items: &[ActivityItem],
) -> Result<Vec<ConflictRef>> {
    let tracking = SqliteTrackingRepository::new(conn);
    let settings = load_privacy(conn, ctx)?;
    let mut conflicts = Vec::new();

    for item in items {
        if !settings.allow_activity_tracking {
            conflicts.push(record_conflict(
                conn,
                ctx,
                ConflictType::PrivacyBlocked,
                &serde_json::json!({
                    "reason": "activity tracking not allowed",
                    "timestamp": item.timestamp,
                }),
            )?);
            continue;
        }

        let Some(covering) = find_covering(conn, ctx, item.timestamp)? else {
            conflicts.push(record_conflict(
                conn,
                ctx,
                ConflictType::NoTimeSession,
                &serde_json::json!({
                    "timestamp": item.timestamp,
                    "app_name": item.app_name,
                    "window_title": item.window_title,
                }),
            )?);
            continue;
        };

        let window = tracking.get_or_create_for_session(&covering)?;

        let timestamp_ms = item.timestamp.timestamp_millis();
        if tracking.event_exists(
            ctx.member_id,
            ctx.org_id,
            timestamp_ms,
            &item.app_name,
            &item.window_title,
        )? {
            conflicts.push(record_conflict(
                conn,
                ctx,
                ConflictType::DuplicateEvent,
                &serde_json::json!({
                    "timestamp": item.timestamp,
                    "app_name": item.app_name,
                    "window_title": item.window_title,
                }),
            )?);
            continue;
        }

        tracking.insert_event(&ActivityEvent {
            id: 0,
            tracking_session_id: window.id,
            timestamp: timestamp_ms,
            app_name: item.app_name.clone(),
            window_title: item.window_title.clone(),
            url: item.url.clone(),
            category: item.category.clone(),
            is_active: item.is_active,
            keyboard_activity_score: item.keyboard_activity_score,
            mouse_activity_score: item.mouse_activity_score,
        })?;
    }

    Ok(conflicts)
}

/// Apply one batch of offline screenshot references
pub(crate) fn process_screenshot_items(
    conn: &Connection,
    tunables: &SyncTunables,
    ctx: &BatchContext<'_>,
    items: &[ScreenshotItem],
) -> Result<Vec<ConflictRef>> {
    let tracking = SqliteTrackingRepository::new(conn);
    let settings = load_privacy(conn, ctx)?;
    let mut conflicts = Vec::new();

    for item in items {
        if !settings.allow_screenshots {
            conflicts.push(record_conflict(
                conn,
                ctx,
                ConflictType::PrivacyBlocked,
                &serde_json::json!({
                    "reason": "screenshots not allowed",
                    "timestamp": item.timestamp,
                }),
            )?);
            continue;
        }

        let Some(covering) = find_covering(conn, ctx, item.timestamp)? else {
            conflicts.push(record_conflict(
                conn,
                ctx,
                ConflictType::NoTimeSession,
                &serde_json::json!({"timestamp": item.timestamp}),
            )?);
            continue;
        };

        let window = tracking.get_or_create_for_session(&covering)?;

        // Path references only; raw image bytes are never accepted or stored
        if !item.has_image_references() {
            conflicts.push(record_conflict(
                conn,
                ctx,
                ConflictType::MissingImage,
                &serde_json::json!({
                    "timestamp": item.timestamp,
                    "storage_path": item.storage_path,
                    "thumbnail_path": item.thumbnail_path,
                }),
            )?);
            continue;
        }

        let masked = settings.mask_personal_windows;
        tracking.insert_screenshot(&Screenshot {
            id: 0,
            tracking_session_id: window.id,
            timestamp: item.timestamp.timestamp_millis(),
            storage_path: item.storage_path.clone().unwrap_or_default(),
            thumbnail_path: item.thumbnail_path.clone().unwrap_or_default(),
            blur_level: if masked { tunables.masked_blur_level } else { 0 },
            is_masked: masked,
        })?;
    }

    Ok(conflicts)
}

/// Missing settings row means nothing was ever allowed
fn load_privacy(conn: &Connection, ctx: &BatchContext<'_>) -> Result<MemberPrivacySettings> {
    Ok(SqlitePrivacyRepository::new(conn)
        .load(ctx.member_id, ctx.org_id)?
        .unwrap_or_default())
}

/// The closed time session covering `timestamp` on its own date, if any
fn find_covering(
    conn: &Connection,
    ctx: &BatchContext<'_>,
    timestamp: DateTime<Utc>,
) -> Result<Option<TimeSession>> {
    SqliteSessionRepository::new(conn).find_covering(
        ctx.member_id,
        ctx.org_id,
        timestamp.date_naive(),
        timestamp.timestamp_millis(),
    )
}
