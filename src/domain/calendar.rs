// ==========================================
// EstrichManager - Compliance calendar entries
// ==========================================
// Read model built by engine::compliance_calendar; never persisted.
// ==========================================

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarEntryKind {
    TestReportExpiry,
    CalibrationDue,
    CorrectiveActionDue,
    EffectivenessCheck,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub date: NaiveDate,
    pub kind: CalendarEntryKind,
    pub reference_id: String, // id of the source record
    pub title: String,        // localized
    pub overdue: bool,
}

/// `date + days`; None when the result leaves chrono's date range
pub fn days_after(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|d| date.checked_add_signed(d))
}
