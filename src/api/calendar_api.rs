// ==========================================
// EstrichManager - Compliance calendar API
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_keys::MAX_WINDOW_DAYS;
use crate::config::ComplianceConfigReader;
use crate::domain::calendar::{days_after, CalendarEntry};
use crate::engine::compliance_calendar::{CalendarSources, ComplianceCalendar};
use crate::repository::calibration_repo::CalibrationRepository;
use crate::repository::deviation_repo::DeviationRepository;
use crate::repository::test_report_repo::TestReportRepository;

pub struct CalendarApi {
    report_repo: Arc<TestReportRepository>,
    calibration_repo: Arc<CalibrationRepository>,
    deviation_repo: Arc<DeviationRepository>,
    config: Arc<dyn ComplianceConfigReader>,
}

impl CalendarApi {
    pub fn new(
        report_repo: Arc<TestReportRepository>,
        calibration_repo: Arc<CalibrationRepository>,
        deviation_repo: Arc<DeviationRepository>,
        config: Arc<dyn ComplianceConfigReader>,
    ) -> Self {
        Self {
            report_repo,
            calibration_repo,
            deviation_repo,
            config,
        }
    }

    /// Overdue and upcoming compliance dates as of `today`
    ///
    /// `horizon_days` overrides the configured look-ahead window
    /// (0 to 3650 days).
    pub async fn get_calendar(
        &self,
        today: NaiveDate,
        horizon_days: Option<i64>,
    ) -> ApiResult<Vec<CalendarEntry>> {
        let horizon = match horizon_days {
            Some(days) if !(0..=i64::from(MAX_WINDOW_DAYS)).contains(&days) => {
                return Err(ApiError::InvalidInput(format!(
                    "horizon must be between 0 and {} days, got {}",
                    MAX_WINDOW_DAYS, days
                )));
            }
            Some(days) => days,
            None => {
                let days = self
                    .config
                    .get_calendar_horizon_days()
                    .await
                    .map_err(|e| ApiError::ConfigError(e.to_string()))?;
                if !(0..=i64::from(MAX_WINDOW_DAYS)).contains(&days) {
                    return Err(ApiError::ConfigError(format!(
                        "configured calendar horizon of {} days is out of range",
                        days
                    )));
                }
                days
            }
        };
        let until = days_after(today, horizon).ok_or_else(|| {
            ApiError::InvalidInput(format!("{} + {} days is out of range", today, horizon))
        })?;

        let test_reports = self.report_repo.list_valid_expiring_until(until)?;
        let calibrations = self.calibration_repo.list_latest()?;
        let actions = self.deviation_repo.list_open_actions_due(until)?;
        let checks = self.deviation_repo.list_pending_checks_due(until)?;

        let entries = ComplianceCalendar::build(
            &CalendarSources {
                test_reports: &test_reports,
                calibrations: &calibrations,
                actions: &actions,
                checks: &checks,
            },
            today,
            horizon,
        );

        debug!(
            today = %today,
            horizon,
            entries = entries.len(),
            overdue = entries.iter().filter(|e| e.overdue).count(),
            "compliance calendar built"
        );
        Ok(entries)
    }
}
