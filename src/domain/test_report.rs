// ==========================================
// EstrichManager - Test reports (ITT / FPC / audit)
// ==========================================

use crate::domain::batch::QcData;
use crate::domain::types::{TestReportStatus, TestReportType};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub id: String,
    pub recipe_id: String,
    pub report_number: String,
    pub report_type: TestReportType,
    pub test_date: NaiveDate,
    pub valid_until: Option<NaiveDate>, // None = open-ended
    pub laboratory: String,
    pub results: QcData,
    pub status: TestReportStatus,
    pub revoked_reason: Option<String>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

/// Input for registering a test report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTestReport {
    pub recipe_id: String,
    pub report_number: String,
    pub report_type: TestReportType,
    pub test_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub laboratory: String,
    #[serde(default)]
    pub results: QcData,
}
