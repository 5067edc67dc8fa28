//! Offline batch sync engine.
//!
//! Accepts device-submitted batches of time, activity, and screenshot
//! records and merges them into server-side state, recording conflicts
//! instead of silently reconciling them. Batches are deduplicated by the
//! (device, member, local batch id) triple and serialized per (member, org)
//! so overlap/duplicate checks never race each other.

mod activity;
mod intake;
mod summary;
mod time_sessions;

pub use summary::recompute_daily_summary;
pub use time_sessions::OFFLINE_SOURCE;

use crate::db::{ConflictRepository, Database, SqliteConflictRepository};
use crate::error::Result;
use crate::models::{BatchType, ConflictType, SyncConflict};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Product-tuned thresholds; configuration, not derived values
#[derive(Debug, Clone)]
pub struct SyncTunables {
    /// Two sessions whose start and end both differ by at most this much
    /// are the same session submitted twice
    pub duplicate_window_ms: i64,
    /// Blur radius applied to screenshots of members with personal-window
    /// masking enabled
    pub masked_blur_level: i64,
}

impl Default for SyncTunables {
    fn default() -> Self {
        Self {
            duplicate_window_ms: 2_000,
            masked_blur_level: 10,
        }
    }
}

/// One device-submitted batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBatch {
    /// Submitting device
    pub device_id: String,
    /// Member the records belong to
    pub member_id: String,
    /// Organization scope
    pub org_id: String,
    /// Caller-generated idempotency component, unique per device+member
    pub local_batch_id: String,
    /// Kind of records in `items`
    pub batch_type: BatchType,
    /// Raw records; interpreted per `batch_type` after being persisted verbatim
    pub items: Vec<serde_json::Value>,
}

/// Success outcome of a batch submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Batch processed; conflicts (if any) recorded and returned
    Applied,
    /// Identity triple already seen; no side effects
    AlreadyApplied,
}

/// Reference to one recorded conflict, returned to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRef {
    /// Ledger row id
    pub id: i64,
    /// Kind of anomaly
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
}

/// What the device gets back for a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReceipt {
    /// Applied or already-applied
    pub status: SyncStatus,
    /// Conflicts recorded while applying this batch
    pub conflicts: Vec<ConflictRef>,
}

impl SyncReceipt {
    /// Receipt for an idempotency short-circuit: no side effects, no conflicts
    #[must_use]
    pub const fn already_applied() -> Self {
        Self {
            status: SyncStatus::AlreadyApplied,
            conflicts: Vec::new(),
        }
    }
}

/// Identity fields of the batch being processed, shared by the processors
pub(crate) struct BatchContext<'a> {
    pub device_id: &'a str,
    pub member_id: &'a str,
    pub org_id: &'a str,
}

/// Record one anomaly in the ledger and hand back its reference
pub(crate) fn record_conflict(
    conn: &Connection,
    ctx: &BatchContext<'_>,
    conflict_type: ConflictType,
    details: &serde_json::Value,
) -> Result<ConflictRef> {
    let id = SqliteConflictRepository::new(conn).record(
        ctx.device_id,
        ctx.member_id,
        ctx.org_id,
        conflict_type,
        details,
    )?;
    tracing::warn!(
        member = ctx.member_id,
        conflict = conflict_type.as_str(),
        id,
        "Recorded sync conflict"
    );
    Ok(ConflictRef { id, conflict_type })
}

/// Per-(member, org) serialization slots.
///
/// Two batches for the same member must not interleave their
/// read-then-write duplicate/overlap checks; the member pair is the lock
/// domain.
#[derive(Default)]
struct MemberLocks {
    slots: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl MemberLocks {
    fn slot(&self, member_id: &str, org_id: &str) -> Arc<Mutex<()>> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        slots
            .entry((member_id.to_string(), org_id.to_string()))
            .or_default()
            .clone()
    }
}

/// The sync engine: one synchronous unit of work per submitted batch.
///
/// There is no cancellation; once intake begins, the batch runs to a
/// terminal state (applied or error).
pub struct SyncEngine {
    db: Mutex<Database>,
    locks: MemberLocks,
    tunables: SyncTunables,
}

impl SyncEngine {
    /// Create an engine with default tunables
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self::with_tunables(db, SyncTunables::default())
    }

    /// Create an engine with explicit tunables
    #[must_use]
    pub fn with_tunables(db: Database, tunables: SyncTunables) -> Self {
        Self {
            db: Mutex::new(db),
            locks: MemberLocks::default(),
            tunables,
        }
    }

    /// Submit one batch; blocks until the batch reaches a terminal state.
    ///
    /// The member lock is taken before the database handle so batches for
    /// different members queue only on the shared connection, while batches
    /// for the same member are fully serialized across the whole
    /// load-decide-insert-recompute span.
    pub fn submit_batch(&self, batch: &SyncBatch) -> Result<SyncReceipt> {
        let slot = self.locks.slot(&batch.member_id, &batch.org_id);
        let _member_guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        intake::run(db.connection(), &self.tunables, batch)
    }

    /// Recent conflicts for a member, newest first
    pub fn conflicts_for_member(
        &self,
        member_id: &str,
        org_id: &str,
        limit: usize,
    ) -> Result<Vec<SyncConflict>> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        SqliteConflictRepository::new(db.connection()).list_for_member(member_id, org_id, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn engine() -> SyncEngine {
        SyncEngine::new(Database::open_in_memory().unwrap())
    }

    fn time_batch(device_id: &str, local_batch_id: &str) -> SyncBatch {
        SyncBatch {
            device_id: device_id.to_string(),
            member_id: "mem-1".to_string(),
            org_id: "org-1".to_string(),
            local_batch_id: local_batch_id.to_string(),
            batch_type: BatchType::Time,
            items: vec![serde_json::json!({
                "started_at": "2024-03-11T09:00:00Z",
                "ended_at": "2024-03-11T12:00:00Z"
            })],
        }
    }

    #[test]
    fn test_submit_twice_is_idempotent() {
        let engine = engine();
        let batch = time_batch("dev-1", "b1");

        assert_eq!(
            engine.submit_batch(&batch).unwrap().status,
            SyncStatus::Applied
        );
        assert_eq!(
            engine.submit_batch(&batch).unwrap().status,
            SyncStatus::AlreadyApplied
        );
    }

    #[test]
    fn test_second_device_conflicts_are_listed() {
        let engine = engine();
        engine.submit_batch(&time_batch("dev-1", "b1")).unwrap();

        // Same interval from another device: duplicate conflict for the member
        let receipt = engine.submit_batch(&time_batch("dev-2", "b1")).unwrap();
        assert_eq!(receipt.status, SyncStatus::Applied);
        assert_eq!(receipt.conflicts.len(), 1);

        let conflicts = engine.conflicts_for_member("mem-1", "org-1", 10).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(
            conflicts[0].conflict_type,
            ConflictType::DuplicateTimeSession
        );
        assert_eq!(conflicts[0].device_id, "dev-2");
    }

    #[test]
    fn test_concurrent_identical_retries_apply_once() {
        let engine = Arc::new(engine());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    engine.submit_batch(&time_batch("dev-1", "b1")).unwrap()
                })
            })
            .collect();

        let receipts: Vec<SyncReceipt> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        let applied = receipts
            .iter()
            .filter(|receipt| receipt.status == SyncStatus::Applied)
            .count();
        assert_eq!(applied, 1);

        // And exactly one session row exists
        let conflicts = engine.conflicts_for_member("mem-1", "org-1", 10).unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_receipt_serialization_shape() {
        let receipt = SyncReceipt {
            status: SyncStatus::Applied,
            conflicts: vec![ConflictRef {
                id: 7,
                conflict_type: ConflictType::NoTimeSession,
            }],
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "applied",
                "conflicts": [{"id": 7, "type": "no_time_session"}]
            })
        );
    }
}
