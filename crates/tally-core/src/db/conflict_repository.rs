//! Conflict ledger repository (append-only)

use crate::error::Result;
use crate::models::{ConflictType, SyncConflict};
use rusqlite::{params, Connection};

/// Trait for the append-only conflict ledger
pub trait ConflictRepository {
    /// Record one detected anomaly; returns the ledger row id
    fn record(
        &self,
        device_id: &str,
        member_id: &str,
        org_id: &str,
        conflict_type: ConflictType,
        details: &serde_json::Value,
    ) -> Result<i64>;

    /// Recent conflicts for a member, newest first
    fn list_for_member(&self, member_id: &str, org_id: &str, limit: usize)
        -> Result<Vec<SyncConflict>>;
}

/// `SQLite` implementation of `ConflictRepository`
pub struct SqliteConflictRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteConflictRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_conflict(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncConflict> {
        let conflict_type: String = row.get(4)?;
        Ok(SyncConflict {
            id: row.get(0)?,
            device_id: row.get(1)?,
            member_id: row.get(2)?,
            org_id: row.get(3)?,
            conflict_type: ConflictType::parse(&conflict_type)
                .unwrap_or(ConflictType::DuplicateEvent),
            details: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl ConflictRepository for SqliteConflictRepository<'_> {
    fn record(
        &self,
        device_id: &str,
        member_id: &str,
        org_id: &str,
        conflict_type: ConflictType,
        details: &serde_json::Value,
    ) -> Result<i64> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT INTO sync_conflicts
             (device_id, member_id, org_id, conflict_type, details, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                device_id,
                member_id,
                org_id,
                conflict_type.as_str(),
                details.to_string(),
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    #[allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT
    fn list_for_member(
        &self,
        member_id: &str,
        org_id: &str,
        limit: usize,
    ) -> Result<Vec<SyncConflict>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, device_id, member_id, org_id, conflict_type, details, created_at
             FROM sync_conflicts
             WHERE member_id = ? AND org_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )?;

        let conflicts = stmt
            .query_map(params![member_id, org_id, limit as i64], Self::parse_conflict)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(conflicts)
    }
}
