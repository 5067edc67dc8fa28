//! Member privacy settings repository.
//!
//! The engine only reads these rows; `save` exists for the external owner
//! (directory/administration) and for test seeding.

use crate::error::Result;
use crate::models::MemberPrivacySettings;
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for privacy settings storage operations
pub trait PrivacyRepository {
    /// Load settings for a member; `None` when nothing was ever configured
    fn load(&self, member_id: &str, org_id: &str) -> Result<Option<MemberPrivacySettings>>;

    /// Upsert settings for a member
    fn save(&self, member_id: &str, org_id: &str, settings: &MemberPrivacySettings) -> Result<()>;
}

/// `SQLite` implementation of `PrivacyRepository`
pub struct SqlitePrivacyRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqlitePrivacyRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl PrivacyRepository for SqlitePrivacyRepository<'_> {
    fn load(&self, member_id: &str, org_id: &str) -> Result<Option<MemberPrivacySettings>> {
        let settings = self
            .conn
            .query_row(
                "SELECT allow_activity_tracking, allow_screenshots, mask_personal_windows
                 FROM member_privacy_settings
                 WHERE member_id = ? AND org_id = ?",
                params![member_id, org_id],
                |row| {
                    Ok(MemberPrivacySettings {
                        allow_activity_tracking: row.get::<_, i32>(0)? != 0,
                        allow_screenshots: row.get::<_, i32>(1)? != 0,
                        mask_personal_windows: row.get::<_, i32>(2)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(settings)
    }

    fn save(&self, member_id: &str, org_id: &str, settings: &MemberPrivacySettings) -> Result<()> {
        self.conn.execute(
            "INSERT INTO member_privacy_settings
             (member_id, org_id, allow_activity_tracking, allow_screenshots, mask_personal_windows)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(member_id, org_id) DO UPDATE SET
                 allow_activity_tracking = excluded.allow_activity_tracking,
                 allow_screenshots = excluded.allow_screenshots,
                 mask_personal_windows = excluded.mask_personal_windows",
            params![
                member_id,
                org_id,
                i32::from(settings.allow_activity_tracking),
                i32::from(settings.allow_screenshots),
                i32::from(settings.mask_personal_windows),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_load_missing_is_none() {
        let db = setup();
        let repo = SqlitePrivacyRepository::new(db.connection());
        assert_eq!(repo.load("mem-1", "org-1").unwrap(), None);
    }

    #[test]
    fn test_save_and_load() {
        let db = setup();
        let repo = SqlitePrivacyRepository::new(db.connection());

        let settings = MemberPrivacySettings {
            allow_activity_tracking: true,
            allow_screenshots: false,
            mask_personal_windows: true,
        };
        repo.save("mem-1", "org-1", &settings).unwrap();
        assert_eq!(repo.load("mem-1", "org-1").unwrap(), Some(settings));

        // Upsert overwrites
        let revoked = MemberPrivacySettings::default();
        repo.save("mem-1", "org-1", &revoked).unwrap();
        assert_eq!(repo.load("mem-1", "org-1").unwrap(), Some(revoked));
    }
}
