//! Database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get::<_, i32>(0).map(|v| v != 0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: sync intake schema
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;

        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS sync_queue_entries (
            id TEXT PRIMARY KEY,
            device_id TEXT NOT NULL,
            member_id TEXT NOT NULL,
            org_id TEXT NOT NULL,
            local_batch_id TEXT NOT NULL,
            batch_type TEXT NOT NULL,
            item_count INTEGER NOT NULL,
            status TEXT NOT NULL,
            received_at INTEGER NOT NULL,
            processed_at INTEGER,
            error_message TEXT
        );
        -- Idempotency key: one processing attempt per batch identity
        CREATE UNIQUE INDEX IF NOT EXISTS idx_queue_identity
            ON sync_queue_entries(device_id, member_id, local_batch_id);
        CREATE INDEX IF NOT EXISTS idx_queue_member
            ON sync_queue_entries(member_id, org_id, received_at DESC);

        CREATE TABLE IF NOT EXISTS sync_items (
            queue_entry_id TEXT NOT NULL REFERENCES sync_queue_entries(id) ON DELETE CASCADE,
            item_index INTEGER NOT NULL,
            payload_type TEXT NOT NULL,
            payload TEXT NOT NULL,
            PRIMARY KEY (queue_entry_id, item_index)
        );

        CREATE TABLE IF NOT EXISTS sync_conflicts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id TEXT NOT NULL,
            member_id TEXT NOT NULL,
            org_id TEXT NOT NULL,
            conflict_type TEXT NOT NULL,
            details TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_conflicts_member
            ON sync_conflicts(member_id, org_id, created_at DESC);

        CREATE TABLE IF NOT EXISTS time_sessions (
            id TEXT PRIMARY KEY,
            member_id TEXT NOT NULL,
            org_id TEXT NOT NULL,
            date TEXT NOT NULL,
            started_at INTEGER NOT NULL,
            ended_at INTEGER,
            status TEXT NOT NULL,
            total_minutes INTEGER NOT NULL DEFAULT 0,
            source TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_member_date
            ON time_sessions(member_id, org_id, date);

        CREATE TABLE IF NOT EXISTS break_sessions (
            id TEXT PRIMARY KEY,
            time_session_id TEXT NOT NULL REFERENCES time_sessions(id) ON DELETE CASCADE,
            started_at INTEGER NOT NULL,
            ended_at INTEGER NOT NULL,
            total_minutes INTEGER NOT NULL,
            is_paid INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_breaks_session
            ON break_sessions(time_session_id);

        CREATE TABLE IF NOT EXISTS tracking_sessions (
            id TEXT PRIMARY KEY,
            time_session_id TEXT NOT NULL REFERENCES time_sessions(id) ON DELETE CASCADE,
            member_id TEXT NOT NULL,
            org_id TEXT NOT NULL,
            started_at INTEGER NOT NULL,
            ended_at INTEGER NOT NULL,
            consent_given INTEGER NOT NULL DEFAULT 0,
            consent_text TEXT NOT NULL
        );
        -- Uniqueness guard for the lookup-or-insert binding: at most one
        -- tracking session per time session
        CREATE UNIQUE INDEX IF NOT EXISTS idx_tracking_time_session
            ON tracking_sessions(time_session_id);
        CREATE INDEX IF NOT EXISTS idx_tracking_member
            ON tracking_sessions(member_id, org_id);

        CREATE TABLE IF NOT EXISTS activity_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tracking_session_id TEXT NOT NULL REFERENCES tracking_sessions(id) ON DELETE CASCADE,
            timestamp INTEGER NOT NULL,
            app_name TEXT NOT NULL,
            window_title TEXT NOT NULL,
            url TEXT,
            category TEXT,
            is_active INTEGER NOT NULL DEFAULT 0,
            keyboard_activity_score REAL,
            mouse_activity_score REAL
        );
        CREATE INDEX IF NOT EXISTS idx_events_session
            ON activity_events(tracking_session_id);
        CREATE INDEX IF NOT EXISTS idx_events_identity
            ON activity_events(timestamp, app_name, window_title);

        CREATE TABLE IF NOT EXISTS screenshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tracking_session_id TEXT NOT NULL REFERENCES tracking_sessions(id) ON DELETE CASCADE,
            timestamp INTEGER NOT NULL,
            storage_path TEXT NOT NULL,
            thumbnail_path TEXT NOT NULL,
            blur_level INTEGER NOT NULL DEFAULT 0,
            is_masked INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_screenshots_session
            ON screenshots(tracking_session_id);

        CREATE TABLE IF NOT EXISTS member_privacy_settings (
            member_id TEXT NOT NULL,
            org_id TEXT NOT NULL,
            allow_activity_tracking INTEGER NOT NULL DEFAULT 0,
            allow_screenshots INTEGER NOT NULL DEFAULT 0,
            mask_personal_windows INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (member_id, org_id)
        );

        INSERT INTO schema_version (version) VALUES (1);

        COMMIT;",
    )?;

    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: daily time summaries
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;

        CREATE TABLE IF NOT EXISTS daily_time_summaries (
            member_id TEXT NOT NULL,
            org_id TEXT NOT NULL,
            date TEXT NOT NULL,
            scheduled_minutes INTEGER NOT NULL DEFAULT 0,
            worked_minutes INTEGER NOT NULL DEFAULT 0,
            paid_break_minutes INTEGER NOT NULL DEFAULT 0,
            unpaid_break_minutes INTEGER NOT NULL DEFAULT 0,
            extra_minutes INTEGER NOT NULL DEFAULT 0,
            short_minutes INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (member_id, org_id, date)
        );

        INSERT INTO schema_version (version) VALUES (2);

        COMMIT;",
    )?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
