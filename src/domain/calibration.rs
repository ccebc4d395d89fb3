// ==========================================
// EstrichManager - Calibration records (lab equipment)
// ==========================================

use chrono::{Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub id: String,
    pub equipment_id: String, // inventory / serial number
    pub equipment_name: String,
    pub calibrated_on: NaiveDate,
    pub interval_months: u32,
    pub next_due: NaiveDate,
    pub performed_by: String,
    pub certificate_ref: Option<String>,
    pub passed: bool,
    pub created_at: NaiveDateTime,
}

/// Input for recording a calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCalibration {
    pub equipment_id: String,
    pub equipment_name: String,
    pub calibrated_on: NaiveDate,
    pub interval_months: u32,
    pub performed_by: String,
    pub certificate_ref: Option<String>,
    pub passed: bool,
}

/// `calibrated_on + interval_months`; month ends clamp (Jan 31 + 1 -> Feb 28/29)
pub fn next_calibration_due(calibrated_on: NaiveDate, interval_months: u32) -> Option<NaiveDate> {
    calibrated_on.checked_add_months(Months::new(interval_months))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_due_clamps_month_end() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(
            next_calibration_due(d, 1),
            NaiveDate::from_ymd_opt(2025, 2, 28)
        );
        assert_eq!(
            next_calibration_due(d, 12),
            NaiveDate::from_ymd_opt(2026, 1, 31)
        );
    }
}
