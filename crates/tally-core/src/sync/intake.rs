//! Batch intake orchestration

use crate::db::{ClaimOutcome, QueueRepository, SqliteQueueRepository};
use crate::error::{Error, Result};
use crate::models::{BatchType, SyncItem, SyncQueueEntry};
use rusqlite::Connection;
use serde::de::DeserializeOwned;

use super::activity::{process_activity_items, process_screenshot_items};
use super::time_sessions::process_time_items;
use super::{BatchContext, ConflictRef, SyncBatch, SyncReceipt, SyncStatus, SyncTunables};

/// Run one batch through the full intake pipeline.
///
/// Caller must hold the (member, org) serialization lock; see `SyncEngine`.
pub(crate) fn run(
    conn: &Connection,
    tunables: &SyncTunables,
    batch: &SyncBatch,
) -> Result<SyncReceipt> {
    validate(batch)?;

    let queue = SqliteQueueRepository::new(conn);

    // Idempotency guard: any existing entry for the triple, whatever its
    // status, means this batch identity has already been handled
    if queue
        .find_by_key(&batch.device_id, &batch.member_id, &batch.local_batch_id)?
        .is_some()
    {
        tracing::info!(
            device = batch.device_id,
            member = batch.member_id,
            local_batch = batch.local_batch_id,
            "Batch already applied; skipping"
        );
        return Ok(SyncReceipt::already_applied());
    }

    let entry = SyncQueueEntry::pending(
        &batch.device_id,
        &batch.member_id,
        &batch.org_id,
        &batch.local_batch_id,
        batch.batch_type,
        batch.items.len(),
    );
    // Unique-constraint backstop for a retry racing the lookup above
    if queue.create_pending(&entry)? == ClaimOutcome::AlreadyQueued {
        return Ok(SyncReceipt::already_applied());
    }

    // Persist every item verbatim before interpreting anything, so the audit
    // trail survives a processing failure
    for (item_index, payload) in batch.items.iter().enumerate() {
        queue.insert_item(&SyncItem {
            queue_entry_id: entry.id,
            item_index,
            payload_type: batch.batch_type,
            payload: payload.to_string(),
        })?;
    }

    let ctx = BatchContext {
        device_id: &batch.device_id,
        member_id: &batch.member_id,
        org_id: &batch.org_id,
    };

    match dispatch(conn, tunables, &ctx, batch) {
        Ok(conflicts) => {
            let now = chrono::Utc::now().timestamp_millis();
            queue.mark_applied(&entry.id, now)?;
            tracing::info!(
                device = batch.device_id,
                member = batch.member_id,
                local_batch = batch.local_batch_id,
                items = batch.items.len(),
                conflicts = conflicts.len(),
                "Applied sync batch"
            );
            Ok(SyncReceipt {
                status: SyncStatus::Applied,
                conflicts,
            })
        }
        Err(error) => {
            // Items inserted before the failure stay in place; only the
            // entry is finalized. A resubmission needs a fresh local batch id.
            let now = chrono::Utc::now().timestamp_millis();
            if let Err(mark_error) = queue.mark_error(&entry.id, now, &error.to_string()) {
                tracing::error!(
                    entry = %entry.id,
                    %mark_error,
                    "Failed to finalize errored queue entry"
                );
            }
            tracing::warn!(
                device = batch.device_id,
                member = batch.member_id,
                local_batch = batch.local_batch_id,
                %error,
                "Sync batch failed"
            );
            Err(error)
        }
    }
}

fn validate(batch: &SyncBatch) -> Result<()> {
    let required = [
        ("device_id", &batch.device_id),
        ("member_id", &batch.member_id),
        ("org_id", &batch.org_id),
        ("local_batch_id", &batch.local_batch_id),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(Error::InvalidInput(format!("{name} must not be empty")));
        }
    }
    Ok(())
}

fn dispatch(
    conn: &Connection,
    tunables: &SyncTunables,
    ctx: &BatchContext<'_>,
    batch: &SyncBatch,
) -> Result<Vec<ConflictRef>> {
    match batch.batch_type {
        BatchType::Time => {
            let items = parse_items(&batch.items)?;
            process_time_items(conn, tunables, ctx, &items)
        }
        BatchType::Activity => {
            let items = parse_items(&batch.items)?;
            process_activity_items(conn, ctx, &items)
        }
        BatchType::Screenshot => {
            let items = parse_items(&batch.items)?;
            process_screenshot_items(conn, tunables, ctx, &items)
        }
    }
}

fn parse_items<T: DeserializeOwned>(items: &[serde_json::Value]) -> Result<Vec<T>> {
    items
        .iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value(value.clone()).map_err(|e| Error::InvalidPayload {
                index,
                message: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::QueueStatus;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn time_batch(local_batch_id: &str, items: Vec<serde_json::Value>) -> SyncBatch {
        SyncBatch {
            device_id: "dev-1".to_string(),
            member_id: "mem-1".to_string(),
            org_id: "org-1".to_string(),
            local_batch_id: local_batch_id.to_string(),
            batch_type: BatchType::Time,
            items,
        }
    }

    fn session_item() -> serde_json::Value {
        serde_json::json!({
            "started_at": "2024-03-11T09:00:00Z",
            "ended_at": "2024-03-11T12:00:00Z"
        })
    }

    fn session_count(db: &Database) -> i64 {
        db.connection()
            .query_row("SELECT COUNT(*) FROM time_sessions", [], |row| row.get(0))
            .unwrap()
    }

    fn entry_for(db: &Database, local_batch_id: &str) -> crate::models::SyncQueueEntry {
        SqliteQueueRepository::new(db.connection())
            .find_by_key("dev-1", "mem-1", local_batch_id)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_applied_batch_finalizes_entry() {
        let db = setup();
        let receipt = run(
            db.connection(),
            &SyncTunables::default(),
            &time_batch("b1", vec![session_item()]),
        )
        .unwrap();
        assert_eq!(receipt.status, SyncStatus::Applied);
        assert!(receipt.conflicts.is_empty());

        let entry = entry_for(&db, "b1");
        assert_eq!(entry.status, QueueStatus::Applied);
        assert!(entry.processed_at.is_some());
        assert_eq!(entry.item_count, 1);
    }

    #[test]
    fn test_resubmission_short_circuits() {
        let db = setup();
        let batch = time_batch("b1", vec![session_item()]);

        let first = run(db.connection(), &SyncTunables::default(), &batch).unwrap();
        assert_eq!(first.status, SyncStatus::Applied);

        let second = run(db.connection(), &SyncTunables::default(), &batch).unwrap();
        assert_eq!(second.status, SyncStatus::AlreadyApplied);
        assert!(second.conflicts.is_empty());

        // Exactly one persisted session despite two submissions
        assert_eq!(session_count(&db), 1);
    }

    #[test]
    fn test_validation_rejects_before_any_persistence() {
        let db = setup();
        let mut batch = time_batch("b1", vec![session_item()]);
        batch.member_id = "  ".to_string();

        let error = run(db.connection(), &SyncTunables::default(), &batch).unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));

        let entries: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM sync_queue_entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(entries, 0);
    }

    #[test]
    fn test_malformed_item_marks_entry_error() {
        let db = setup();
        let batch = time_batch(
            "b1",
            vec![session_item(), serde_json::json!({"bogus": true})],
        );

        let error = run(db.connection(), &SyncTunables::default(), &batch).unwrap_err();
        assert!(matches!(error, Error::InvalidPayload { index: 1, .. }));

        let entry = entry_for(&db, "b1");
        assert_eq!(entry.status, QueueStatus::Error);
        assert!(entry.error_message.is_some());

        // Verbatim audit trail survives the failure
        let items = SqliteQueueRepository::new(db.connection())
            .items_for_entry(&entry.id)
            .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_errored_identity_is_not_rerun() {
        let db = setup();
        let bad = time_batch("b1", vec![serde_json::json!({"bogus": true})]);
        run(db.connection(), &SyncTunables::default(), &bad).unwrap_err();

        // Same local batch id, now with valid items: still short-circuited
        let retry = time_batch("b1", vec![session_item()]);
        let receipt = run(db.connection(), &SyncTunables::default(), &retry).unwrap();
        assert_eq!(receipt.status, SyncStatus::AlreadyApplied);
        assert_eq!(session_count(&db), 0);

        // A fresh local batch id goes through
        let fresh = time_batch("b2", vec![session_item()]);
        let receipt = run(db.connection(), &SyncTunables::default(), &fresh).unwrap();
        assert_eq!(receipt.status, SyncStatus::Applied);
        assert_eq!(session_count(&db), 1);
    }

    #[test]
    fn test_conflicts_are_returned_to_caller() {
        let db = setup();
        run(
            db.connection(),
            &SyncTunables::default(),
            &time_batch("b1", vec![session_item()]),
        )
        .unwrap();

        let receipt = run(
            db.connection(),
            &SyncTunables::default(),
            &time_batch("b2", vec![session_item()]),
        )
        .unwrap();
        assert_eq!(receipt.status, SyncStatus::Applied);
        assert_eq!(receipt.conflicts.len(), 1);
        assert!(receipt.conflicts[0].id > 0);
    }

    #[test]
    fn test_empty_batch_is_applied() {
        let db = setup();
        let receipt = run(
            db.connection(),
            &SyncTunables::default(),
            &time_batch("b1", Vec::new()),
        )
        .unwrap();
        assert_eq!(receipt.status, SyncStatus::Applied);
        assert_eq!(entry_for(&db, "b1").item_count, 0);
    }
}
