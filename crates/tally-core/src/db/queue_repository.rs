//! Sync queue entry and item repository

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)] // SQLite uses i64 for counts/indexes

use crate::error::{Error, Result};
use crate::models::{BatchType, QueueEntryId, QueueStatus, SyncItem, SyncQueueEntry};
use rusqlite::{params, Connection};

/// Outcome of the atomic lookup-and-create on the idempotency key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The entry was created; this caller owns processing
    Claimed,
    /// An entry with the same (device, member, local batch id) already exists
    AlreadyQueued,
}

/// Trait for queue entry and raw item storage operations
pub trait QueueRepository {
    /// Look up an entry by its idempotency key
    fn find_by_key(
        &self,
        device_id: &str,
        member_id: &str,
        local_batch_id: &str,
    ) -> Result<Option<SyncQueueEntry>>;

    /// Insert a pending entry; the unique idempotency index makes this the
    /// atomic claim under concurrent identical retries
    fn create_pending(&self, entry: &SyncQueueEntry) -> Result<ClaimOutcome>;

    /// Transition an entry to `applied`
    fn mark_applied(&self, id: &QueueEntryId, processed_at: i64) -> Result<()>;

    /// Transition an entry to `error` with the captured message
    fn mark_error(&self, id: &QueueEntryId, processed_at: i64, message: &str) -> Result<()>;

    /// Persist one raw item verbatim
    fn insert_item(&self, item: &SyncItem) -> Result<()>;

    /// Read back the verbatim items of an entry, in submission order
    fn items_for_entry(&self, id: &QueueEntryId) -> Result<Vec<SyncItem>>;
}

/// `SQLite` implementation of `QueueRepository`
pub struct SqliteQueueRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteQueueRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a queue entry from a database row
    fn parse_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncQueueEntry> {
        let id: String = row.get(0)?;
        let batch_type: String = row.get(5)?;
        let status: String = row.get(7)?;
        Ok(SyncQueueEntry {
            id: id.parse().unwrap_or_default(),
            device_id: row.get(1)?,
            member_id: row.get(2)?,
            org_id: row.get(3)?,
            local_batch_id: row.get(4)?,
            batch_type: BatchType::parse(&batch_type).unwrap_or(BatchType::Time),
            item_count: row.get::<_, i64>(6)? as usize,
            status: QueueStatus::parse(&status).unwrap_or(QueueStatus::Pending),
            received_at: row.get(8)?,
            processed_at: row.get(9)?,
            error_message: row.get(10)?,
        })
    }
}

const ENTRY_COLUMNS: &str = "id, device_id, member_id, org_id, local_batch_id, batch_type, \
                             item_count, status, received_at, processed_at, error_message";

impl QueueRepository for SqliteQueueRepository<'_> {
    fn find_by_key(
        &self,
        device_id: &str,
        member_id: &str,
        local_batch_id: &str,
    ) -> Result<Option<SyncQueueEntry>> {
        let result = self.conn.query_row(
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM sync_queue_entries
                 WHERE device_id = ? AND member_id = ? AND local_batch_id = ?"
            ),
            params![device_id, member_id, local_batch_id],
            Self::parse_entry,
        );

        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn create_pending(&self, entry: &SyncQueueEntry) -> Result<ClaimOutcome> {
        let result = self.conn.execute(
            "INSERT INTO sync_queue_entries
             (id, device_id, member_id, org_id, local_batch_id, batch_type,
              item_count, status, received_at, processed_at, error_message)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entry.id.as_str(),
                entry.device_id,
                entry.member_id,
                entry.org_id,
                entry.local_batch_id,
                entry.batch_type.as_str(),
                entry.item_count as i64,
                entry.status.as_str(),
                entry.received_at,
                entry.processed_at,
                entry.error_message,
            ],
        );

        match result {
            Ok(_) => Ok(ClaimOutcome::Claimed),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(ClaimOutcome::AlreadyQueued)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn mark_applied(&self, id: &QueueEntryId, processed_at: i64) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE sync_queue_entries
             SET status = 'applied', processed_at = ?, error_message = NULL
             WHERE id = ?",
            params![processed_at, id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(format!("queue entry {id}")));
        }
        Ok(())
    }

    fn mark_error(&self, id: &QueueEntryId, processed_at: i64, message: &str) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE sync_queue_entries
             SET status = 'error', processed_at = ?, error_message = ?
             WHERE id = ?",
            params![processed_at, message, id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(format!("queue entry {id}")));
        }
        Ok(())
    }

    fn insert_item(&self, item: &SyncItem) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_items (queue_entry_id, item_index, payload_type, payload)
             VALUES (?, ?, ?, ?)",
            params![
                item.queue_entry_id.as_str(),
                item.item_index as i64,
                item.payload_type.as_str(),
                item.payload,
            ],
        )?;
        Ok(())
    }

    fn items_for_entry(&self, id: &QueueEntryId) -> Result<Vec<SyncItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT queue_entry_id, item_index, payload_type, payload
             FROM sync_items WHERE queue_entry_id = ?
             ORDER BY item_index ASC",
        )?;

        let items = stmt
            .query_map(params![id.as_str()], |row| {
                let entry_id: String = row.get(0)?;
                let payload_type: String = row.get(2)?;
                Ok(SyncItem {
                    queue_entry_id: entry_id.parse().unwrap_or_default(),
                    item_index: row.get::<_, i64>(1)? as usize,
                    payload_type: BatchType::parse(&payload_type).unwrap_or(BatchType::Time),
                    payload: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }
}
