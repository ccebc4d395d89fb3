// ==========================================
// EstrichManager - Compliance calendar
// ==========================================
// Collects upcoming and overdue compliance dates from the
// record tables. Delivery (mail, ical, ...) is not done here.
// ==========================================

use crate::domain::calendar::{days_after, CalendarEntry, CalendarEntryKind};
use crate::domain::calibration::CalibrationRecord;
use crate::domain::deviation::{CorrectiveAction, EffectivenessCheck};
use crate::domain::test_report::TestReport;
use crate::domain::types::{CheckResult, TestReportStatus};
use crate::i18n;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Default look-ahead window
pub const DEFAULT_HORIZON_DAYS: i64 = 30;

/// Record sets the calendar is built from.
/// Actions and checks are paired with their deviation number.
#[derive(Default)]
pub struct CalendarSources<'a> {
    pub test_reports: &'a [TestReport],
    pub calibrations: &'a [CalibrationRecord],
    pub actions: &'a [(CorrectiveAction, String)],
    pub checks: &'a [(EffectivenessCheck, String)],
}

pub struct ComplianceCalendar;

impl ComplianceCalendar {
    /// Entries due on or before `today + horizon_days`, sorted by date
    ///
    /// Entries before `today` are flagged overdue. Only the latest
    /// calibration of each piece of equipment counts. A window past
    /// the last representable date ends there.
    pub fn build(sources: &CalendarSources<'_>, today: NaiveDate, horizon_days: i64) -> Vec<CalendarEntry> {
        let end = days_after(today, horizon_days.max(0)).unwrap_or(NaiveDate::MAX);
        let mut entries = Vec::new();

        let mut push = |date: NaiveDate, kind: CalendarEntryKind, reference_id: &str, title: String| {
            if date <= end {
                entries.push(CalendarEntry {
                    date,
                    kind,
                    reference_id: reference_id.to_string(),
                    title,
                    overdue: date < today,
                });
            }
        };

        for report in sources.test_reports {
            if report.status != TestReportStatus::Valid {
                continue;
            }
            if let Some(until) = report.valid_until {
                push(
                    until,
                    CalendarEntryKind::TestReportExpiry,
                    &report.id,
                    i18n::t_with_args(
                        "calendar.test_report_expiry",
                        &[("reference", report.report_number.as_str())],
                    ),
                );
            }
        }

        for record in latest_calibrations(sources.calibrations) {
            let reference = format!("{} ({})", record.equipment_name, record.equipment_id);
            push(
                record.next_due,
                CalendarEntryKind::CalibrationDue,
                &record.id,
                i18n::t_with_args("calendar.calibration_due", &[("reference", reference.as_str())]),
            );
        }

        for (action, deviation_number) in sources.actions {
            if !action.is_open() {
                continue;
            }
            push(
                action.planned_due,
                CalendarEntryKind::CorrectiveActionDue,
                &action.id,
                i18n::t_with_args(
                    "calendar.corrective_action_due",
                    &[("reference", deviation_number.as_str())],
                ),
            );
        }

        for (check, deviation_number) in sources.checks {
            if check.result != CheckResult::Pending {
                continue;
            }
            push(
                check.planned_date,
                CalendarEntryKind::EffectivenessCheck,
                &check.id,
                i18n::t_with_args(
                    "calendar.effectiveness_check",
                    &[("reference", deviation_number.as_str())],
                ),
            );
        }

        entries.sort_by(|a, b| {
            (a.date, a.kind, &a.reference_id).cmp(&(b.date, b.kind, &b.reference_id))
        });
        entries
    }
}

fn latest_calibrations(records: &[CalibrationRecord]) -> Vec<&CalibrationRecord> {
    let mut latest: HashMap<&str, &CalibrationRecord> = HashMap::new();
    for record in records {
        latest
            .entry(record.equipment_id.as_str())
            .and_modify(|current| {
                if record.calibrated_on > current.calibrated_on {
                    *current = record;
                }
            })
            .or_insert(record);
    }
    latest.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::QcData;
    use crate::domain::types::{ActionKind, ActionStatus, TestReportType};
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn report(id: &str, valid_until: NaiveDate, status: TestReportStatus) -> TestReport {
        TestReport {
            id: id.to_string(),
            recipe_id: "REC1".to_string(),
            report_number: format!("PB-{}", id),
            report_type: TestReportType::InitialTypeTest,
            test_date: date(2022, 1, 1),
            valid_until: Some(valid_until),
            laboratory: "MPA".to_string(),
            results: QcData::default(),
            status,
            revoked_reason: None,
            created_by: "test".to_string(),
            created_at: Utc::now().naive_utc(),
        }
    }

    fn calibration(id: &str, equipment: &str, on: NaiveDate, next_due: NaiveDate) -> CalibrationRecord {
        CalibrationRecord {
            id: id.to_string(),
            equipment_id: equipment.to_string(),
            equipment_name: "Prüfpresse".to_string(),
            calibrated_on: on,
            interval_months: 12,
            next_due,
            performed_by: "DAkkS Labor".to_string(),
            certificate_ref: None,
            passed: true,
            created_at: Utc::now().naive_utc(),
        }
    }

    fn action(id: &str, due: NaiveDate, status: ActionStatus) -> CorrectiveAction {
        CorrectiveAction {
            id: id.to_string(),
            deviation_id: "D1".to_string(),
            kind: ActionKind::Corrective,
            description: "Dosierung prüfen".to_string(),
            responsible_person: "Werkleiter".to_string(),
            planned_start: due,
            planned_due: due,
            actual_start: None,
            actual_completion: None,
            status,
            completion_note: None,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_window_and_overdue_flags() {
        let today = date(2025, 6, 1);
        let reports = vec![
            report("R1", date(2025, 6, 20), TestReportStatus::Valid),
            report("R2", date(2025, 8, 1), TestReportStatus::Valid), // outside window
            report("R3", date(2025, 6, 5), TestReportStatus::Revoked), // ignored
            report("R4", date(2025, 5, 30), TestReportStatus::Valid), // overdue
        ];
        let sources = CalendarSources {
            test_reports: &reports,
            ..Default::default()
        };

        let entries = ComplianceCalendar::build(&sources, today, 30);
        let ids: Vec<_> = entries.iter().map(|e| e.reference_id.as_str()).collect();
        assert_eq!(ids, vec!["R4", "R1"]);
        assert!(entries[0].overdue);
        assert!(!entries[1].overdue);
    }

    #[test]
    fn test_only_latest_calibration_counts() {
        let today = date(2025, 6, 1);
        let calibrations = vec![
            calibration("C1", "PP-01", date(2024, 5, 1), date(2025, 5, 1)),
            calibration("C2", "PP-01", date(2025, 5, 2), date(2026, 5, 2)),
            calibration("C3", "W-02", date(2024, 6, 10), date(2025, 6, 10)),
        ];
        let sources = CalendarSources {
            calibrations: &calibrations,
            ..Default::default()
        };

        let entries = ComplianceCalendar::build(&sources, today, 30);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reference_id, "C3");
        assert_eq!(entries[0].kind, CalendarEntryKind::CalibrationDue);
    }

    #[test]
    fn test_closed_actions_are_skipped_and_sorting_is_by_date() {
        let today = date(2025, 6, 1);
        let actions = vec![
            (action("A1", date(2025, 6, 15), ActionStatus::InProgress), "DEV-2025-0001".to_string()),
            (action("A2", date(2025, 6, 3), ActionStatus::Completed), "DEV-2025-0001".to_string()),
            (action("A3", date(2025, 6, 2), ActionStatus::Planned), "DEV-2025-0002".to_string()),
        ];
        let sources = CalendarSources {
            actions: &actions,
            ..Default::default()
        };

        let entries = ComplianceCalendar::build(&sources, today, 30);
        let ids: Vec<_> = entries.iter().map(|e| e.reference_id.as_str()).collect();
        assert_eq!(ids, vec!["A3", "A1"]);
        assert!(entries[0].title.contains("DEV-2025-0002"));
    }

    #[test]
    fn test_huge_horizon_does_not_overflow() {
        let today = date(2025, 6, 1);
        let reports = vec![report("R1", date(2099, 1, 1), TestReportStatus::Valid)];
        let sources = CalendarSources {
            test_reports: &reports,
            ..Default::default()
        };

        let entries = ComplianceCalendar::build(&sources, today, i64::MAX);
        assert_eq!(entries.len(), 1);
    }
}
