//! Member privacy settings model

use serde::{Deserialize, Serialize};

/// Per-(member, org) capture permissions, owned externally and read-only here.
///
/// Absence of a row means nothing was ever allowed; the processors treat a
/// missing flag the same as an explicit `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MemberPrivacySettings {
    /// Activity events may be recorded
    pub allow_activity_tracking: bool,
    /// Screenshots may be recorded
    pub allow_screenshots: bool,
    /// Screenshots of personal windows must be blurred
    pub mask_personal_windows: bool,
}
