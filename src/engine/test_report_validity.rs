// ==========================================
// EstrichManager - Test report validity rules
// ==========================================

use crate::domain::test_report::TestReport;
use crate::domain::types::{TestReportStatus, TestReportType};
use chrono::{Months, NaiveDate};
use thiserror::Error;

/// Default ITT validity when no configuration is present
pub const DEFAULT_ITT_VALIDITY_YEARS: u32 = 3;

/// The default expiry of an initial type test is not a representable date
#[derive(Error, Debug, Clone, PartialEq)]
#[error("test date {test_date} + {years} years is out of the supported date range")]
pub struct ValidityOutOfRange {
    pub test_date: NaiveDate,
    pub years: u32,
}

pub struct TestReportValidity;

impl TestReportValidity {
    /// Expiry assigned when the report carries none
    ///
    /// # Rules
    /// - initial_type_test -> test_date + `itt_validity_years` (Feb 29 clamps to Feb 28)
    /// - factory_control / audit -> open-ended (None)
    ///
    /// An ITT never becomes open-ended: an expiry outside the date
    /// range is an error.
    pub fn default_valid_until(
        report_type: TestReportType,
        test_date: NaiveDate,
        itt_validity_years: u32,
    ) -> Result<Option<NaiveDate>, ValidityOutOfRange> {
        match report_type {
            TestReportType::InitialTypeTest => itt_validity_years
                .checked_mul(12)
                .and_then(|months| test_date.checked_add_months(Months::new(months)))
                .map(Some)
                .ok_or(ValidityOutOfRange {
                    test_date,
                    years: itt_validity_years,
                }),
            TestReportType::FactoryControl | TestReportType::Audit => Ok(None),
        }
    }

    /// Explicit expiry wins over the default
    pub fn resolve_valid_until(
        report_type: TestReportType,
        test_date: NaiveDate,
        explicit: Option<NaiveDate>,
        itt_validity_years: u32,
    ) -> Result<Option<NaiveDate>, ValidityOutOfRange> {
        match explicit {
            Some(until) => Ok(Some(until)),
            None => Self::default_valid_until(report_type, test_date, itt_validity_years),
        }
    }

    /// Status as of `on`: revoked stays revoked, a valid report past
    /// its `valid_until` is expired. The report is still valid on the
    /// `valid_until` day itself.
    pub fn effective_status(report: &TestReport, on: NaiveDate) -> TestReportStatus {
        match report.status {
            TestReportStatus::Revoked => TestReportStatus::Revoked,
            TestReportStatus::Expired => TestReportStatus::Expired,
            TestReportStatus::Valid => match report.valid_until {
                Some(until) if until < on => TestReportStatus::Expired,
                _ => TestReportStatus::Valid,
            },
        }
    }

    pub fn is_usable_on(report: &TestReport, on: NaiveDate) -> bool {
        Self::effective_status(report, on) == TestReportStatus::Valid && report.test_date <= on
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::QcData;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn report(status: TestReportStatus, valid_until: Option<NaiveDate>) -> TestReport {
        TestReport {
            id: "R1".to_string(),
            recipe_id: "REC1".to_string(),
            report_number: "ITT-2022-01".to_string(),
            report_type: TestReportType::InitialTypeTest,
            test_date: date(2022, 5, 10),
            valid_until,
            laboratory: "MPA".to_string(),
            results: QcData::default(),
            status,
            revoked_reason: None,
            created_by: "test".to_string(),
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_itt_defaults_to_three_years() {
        assert_eq!(
            TestReportValidity::default_valid_until(
                TestReportType::InitialTypeTest,
                date(2022, 5, 10),
                DEFAULT_ITT_VALIDITY_YEARS
            ),
            Ok(Some(date(2025, 5, 10)))
        );
    }

    #[test]
    fn test_leap_day_clamps() {
        assert_eq!(
            TestReportValidity::default_valid_until(
                TestReportType::InitialTypeTest,
                date(2024, 2, 29),
                3
            ),
            Ok(Some(date(2027, 2, 28)))
        );
    }

    #[test]
    fn test_other_types_are_open_ended() {
        assert_eq!(
            TestReportValidity::default_valid_until(TestReportType::FactoryControl, date(2024, 1, 1), 3),
            Ok(None)
        );
        assert_eq!(
            TestReportValidity::default_valid_until(TestReportType::Audit, date(2024, 1, 1), 3),
            Ok(None)
        );
    }

    #[test]
    fn test_explicit_expiry_wins() {
        assert_eq!(
            TestReportValidity::resolve_valid_until(
                TestReportType::InitialTypeTest,
                date(2024, 1, 1),
                Some(date(2025, 1, 1)),
                3
            ),
            Ok(Some(date(2025, 1, 1)))
        );
    }

    #[test]
    fn test_itt_expiry_out_of_range_is_an_error() {
        let test_date = date(2024, 6, 1);
        // months overflow u32
        assert_eq!(
            TestReportValidity::default_valid_until(
                TestReportType::InitialTypeTest,
                test_date,
                400_000_000
            ),
            Err(ValidityOutOfRange {
                test_date,
                years: 400_000_000
            })
        );
        // beyond the last representable date
        assert!(TestReportValidity::default_valid_until(
            TestReportType::InitialTypeTest,
            test_date,
            1_000_000
        )
        .is_err());
        // open-ended types ignore the setting
        assert_eq!(
            TestReportValidity::resolve_valid_until(TestReportType::Audit, test_date, None, u32::MAX),
            Ok(None)
        );
    }

    #[test]
    fn test_effective_status() {
        let r = report(TestReportStatus::Valid, Some(date(2025, 5, 10)));
        assert_eq!(TestReportValidity::effective_status(&r, date(2025, 5, 10)), TestReportStatus::Valid);
        assert_eq!(TestReportValidity::effective_status(&r, date(2025, 5, 11)), TestReportStatus::Expired);

        let r = report(TestReportStatus::Revoked, Some(date(2030, 1, 1)));
        assert_eq!(TestReportValidity::effective_status(&r, date(2025, 1, 1)), TestReportStatus::Revoked);

        let r = report(TestReportStatus::Valid, None);
        assert!(TestReportValidity::is_usable_on(&r, date(2040, 1, 1)));
        assert!(!TestReportValidity::is_usable_on(&r, date(2022, 5, 9)));
    }
}
