// ==========================================
// EstrichManager - Calibration API
// ==========================================

use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::api::error::{optional, required, ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::calibration::{next_calibration_due, CalibrationRecord, NewCalibration};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::calibration_repo::CalibrationRepository;

pub struct CalibrationApi {
    calibration_repo: Arc<CalibrationRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl CalibrationApi {
    pub fn new(
        calibration_repo: Arc<CalibrationRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            calibration_repo,
            action_log_repo,
        }
    }

    /// Record a calibration; `next_due` = calibrated_on + interval
    pub fn record_calibration(&self, input: NewCalibration, actor: &str) -> ApiResult<CalibrationRecord> {
        let actor = required(actor, "actor")?;
        if input.interval_months == 0 {
            return Err(ApiError::InvalidInput(
                "calibration interval must be at least one month".to_string(),
            ));
        }
        let next_due = next_calibration_due(input.calibrated_on, input.interval_months)
            .ok_or_else(|| {
                ApiError::InvalidInput(format!(
                    "interval of {} months is out of range",
                    input.interval_months
                ))
            })?;

        let record = CalibrationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            equipment_id: required(&input.equipment_id, "equipment_id")?,
            equipment_name: required(&input.equipment_name, "equipment_name")?,
            calibrated_on: input.calibrated_on,
            interval_months: input.interval_months,
            next_due,
            performed_by: required(&input.performed_by, "performed_by")?,
            certificate_ref: optional(input.certificate_ref.as_deref()),
            passed: input.passed,
            created_at: Local::now().naive_local(),
        };

        self.calibration_repo.insert(&record)?;
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::RecordCalibration, "calibration", &record.id, &actor)
                .with_payload(&record)
                .with_detail(format!("{} calibrated, next due {}", record.equipment_id, record.next_due)),
        )?;

        if record.passed {
            info!(equipment_id = %record.equipment_id, next_due = %record.next_due, "calibration recorded");
        } else {
            warn!(equipment_id = %record.equipment_id, "calibration failed, equipment out of tolerance");
        }
        Ok(record)
    }

    pub fn latest_calibration(&self, equipment_id: &str) -> ApiResult<CalibrationRecord> {
        self.calibration_repo
            .find_latest(equipment_id.trim())?
            .ok_or_else(|| ApiError::NotFound(format!("calibration of {}", equipment_id)))
    }

    pub fn calibration_history(&self, equipment_id: &str) -> ApiResult<Vec<CalibrationRecord>> {
        Ok(self.calibration_repo.list_by_equipment(equipment_id.trim())?)
    }

    /// Latest record per piece of equipment, earliest next_due first
    pub fn list_equipment_status(&self) -> ApiResult<Vec<CalibrationRecord>> {
        Ok(self.calibration_repo.list_latest()?)
    }
}
