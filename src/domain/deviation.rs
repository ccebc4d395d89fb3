// ==========================================
// EstrichManager - Deviation / CAPA records
// ==========================================
// Deviation is the aggregate root; corrective actions and
// effectiveness checks are child rows keyed by deviation_id.
// ==========================================

use crate::domain::types::{
    ActionKind, ActionStatus, CheckResult, DeviationSeverity, DeviationSource, DeviationStatus,
    DeviationType, RootCauseMethod,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Deviation
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deviation {
    pub id: String,
    pub deviation_number: String, // DEV-{YYYY}-{seq}
    pub title: String,
    pub description: String,
    pub deviation_type: DeviationType,
    pub severity: DeviationSeverity,
    pub source: DeviationSource,
    pub status: DeviationStatus,

    // ===== optional links =====
    pub recipe_id: Option<String>,
    pub batch_id: Option<String>,

    pub root_cause: Option<RootCauseAnalysis>, // stored as JSON

    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub closed_at: Option<NaiveDateTime>,
}

/// Input for opening a deviation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeviation {
    pub title: String,
    pub description: String,
    pub deviation_type: DeviationType,
    pub severity: DeviationSeverity,
    pub source: DeviationSource,
    pub recipe_id: Option<String>,
    pub batch_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseAnalysis {
    pub method: RootCauseMethod,
    pub summary: String,
    #[serde(default)]
    pub contributing_factors: Vec<String>,
    pub analysed_by: String,
    pub analysed_on: NaiveDate,
}

// ==========================================
// CorrectiveAction
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectiveAction {
    pub id: String,
    pub deviation_id: String,
    pub kind: ActionKind,
    pub description: String,
    pub responsible_person: String,
    pub planned_start: NaiveDate,
    pub planned_due: NaiveDate,
    pub actual_start: Option<NaiveDate>,
    pub actual_completion: Option<NaiveDate>,
    pub status: ActionStatus,
    pub completion_note: Option<String>,
    pub created_at: NaiveDateTime,
}

impl CorrectiveAction {
    pub fn is_open(&self) -> bool {
        matches!(self.status, ActionStatus::Planned | ActionStatus::InProgress)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && self.planned_due < today
    }
}

/// Input for planning a corrective action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCorrectiveAction {
    pub kind: ActionKind,
    pub description: String,
    pub responsible_person: String,
    pub planned_start: NaiveDate,
    pub planned_due: NaiveDate,
}

// ==========================================
// EffectivenessCheck
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectivenessCheck {
    pub id: String,
    pub deviation_id: String,
    pub success_criteria: String,
    pub planned_date: NaiveDate,
    pub performed_on: Option<NaiveDate>,
    pub performed_by: Option<String>,
    pub result: CheckResult,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Deviation with its child records, as shown in a CAPA detail view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviationDetail {
    pub deviation: Deviation,
    pub actions: Vec<CorrectiveAction>,
    pub checks: Vec<EffectivenessCheck>,
}
