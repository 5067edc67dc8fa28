//! Daily time summary model and status rule

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Classification of a member's day against their schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    /// Worked the scheduled amount (or worked with no schedule configured)
    Normal,
    /// Worked more than scheduled
    Extra,
    /// Worked less than scheduled
    Short,
    /// Scheduled but no effective work recorded
    Absent,
    /// No schedule configured and no effective work recorded
    Unconfigured,
}

impl SummaryStatus {
    /// Database representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Extra => "extra",
            Self::Short => "short",
            Self::Absent => "absent",
            Self::Unconfigured => "unconfigured",
        }
    }

    /// Parse the database representation
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(Self::Normal),
            "extra" => Some(Self::Extra),
            "short" => Some(Self::Short),
            "absent" => Some(Self::Absent),
            "unconfigured" => Some(Self::Unconfigured),
            _ => None,
        }
    }
}

/// Fully recomputed per-member-per-date aggregate.
///
/// Scheduled minutes are owned by scheduling and only read here; everything
/// else is derived from the closed sessions and breaks of the date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTimeSummary {
    /// Member the summary belongs to
    pub member_id: String,
    /// Organization scope
    pub org_id: String,
    /// Calendar date
    pub date: NaiveDate,
    /// Minutes scheduled for the day (externally owned)
    pub scheduled_minutes: i64,
    /// Sum of closed-session minutes
    pub worked_minutes: i64,
    /// Sum of paid break minutes
    pub paid_break_minutes: i64,
    /// Sum of unpaid break minutes
    pub unpaid_break_minutes: i64,
    /// Minutes worked beyond schedule
    pub extra_minutes: i64,
    /// Minutes short of schedule
    pub short_minutes: i64,
    /// Day classification
    pub status: SummaryStatus,
}

impl DailyTimeSummary {
    /// Derive the summary for a day from its raw sums.
    ///
    /// `effective_worked` is worked minutes minus unpaid breaks, floored at
    /// zero. The status rules are evaluated in order: unscheduled days are
    /// `normal` when any effective work exists and `unconfigured` otherwise;
    /// scheduled days are `absent` with no effective work, `extra`/`short`
    /// with the corresponding delta, and `normal` on an exact match.
    #[must_use]
    pub fn compute(
        member_id: impl Into<String>,
        org_id: impl Into<String>,
        date: NaiveDate,
        scheduled_minutes: i64,
        worked_minutes: i64,
        paid_break_minutes: i64,
        unpaid_break_minutes: i64,
    ) -> Self {
        let effective_worked = (worked_minutes - unpaid_break_minutes).max(0);

        let (status, extra_minutes, short_minutes) = if scheduled_minutes == 0 {
            if effective_worked > 0 {
                (SummaryStatus::Normal, 0, 0)
            } else {
                (SummaryStatus::Unconfigured, 0, 0)
            }
        } else if effective_worked == 0 {
            (SummaryStatus::Absent, 0, 0)
        } else if effective_worked > scheduled_minutes {
            (SummaryStatus::Extra, effective_worked - scheduled_minutes, 0)
        } else if effective_worked < scheduled_minutes {
            (SummaryStatus::Short, 0, scheduled_minutes - effective_worked)
        } else {
            (SummaryStatus::Normal, 0, 0)
        };

        Self {
            member_id: member_id.into(),
            org_id: org_id.into(),
            date,
            scheduled_minutes,
            worked_minutes,
            paid_break_minutes,
            unpaid_break_minutes,
            extra_minutes,
            short_minutes,
            status,
        }
    }

    /// Worked minutes minus unpaid breaks, floored at zero
    #[must_use]
    pub const fn effective_worked_minutes(&self) -> i64 {
        let effective = self.worked_minutes - self.unpaid_break_minutes;
        if effective < 0 {
            0
        } else {
            effective
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
    }

    fn compute(scheduled: i64, worked: i64, paid: i64, unpaid: i64) -> DailyTimeSummary {
        DailyTimeSummary::compute("mem-1", "org-1", date(), scheduled, worked, paid, unpaid)
    }

    #[test]
    fn test_short_day() {
        // 500 worked - 30 unpaid = 470 effective against 480 scheduled
        let summary = compute(480, 500, 0, 30);
        assert_eq!(summary.effective_worked_minutes(), 470);
        assert_eq!(summary.status, SummaryStatus::Short);
        assert_eq!(summary.short_minutes, 10);
        assert_eq!(summary.extra_minutes, 0);
    }

    #[test]
    fn test_extra_day() {
        let summary = compute(480, 540, 15, 0);
        assert_eq!(summary.status, SummaryStatus::Extra);
        assert_eq!(summary.extra_minutes, 60);
        assert_eq!(summary.short_minutes, 0);
    }

    #[test]
    fn test_exact_match_is_normal() {
        let summary = compute(480, 480, 0, 0);
        assert_eq!(summary.status, SummaryStatus::Normal);
        assert_eq!(summary.extra_minutes, 0);
        assert_eq!(summary.short_minutes, 0);
    }

    #[test]
    fn test_scheduled_without_work_is_absent() {
        let summary = compute(480, 0, 0, 0);
        assert_eq!(summary.status, SummaryStatus::Absent);
    }

    #[test]
    fn test_unscheduled_with_work_is_normal() {
        let summary = compute(0, 120, 0, 0);
        assert_eq!(summary.status, SummaryStatus::Normal);
    }

    #[test]
    fn test_unscheduled_without_work_is_unconfigured() {
        let summary = compute(0, 0, 0, 0);
        assert_eq!(summary.status, SummaryStatus::Unconfigured);
    }

    #[test]
    fn test_unpaid_breaks_cannot_go_negative() {
        let summary = compute(480, 20, 0, 45);
        assert_eq!(summary.effective_worked_minutes(), 0);
        assert_eq!(summary.status, SummaryStatus::Absent);
    }
}
