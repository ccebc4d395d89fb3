// ==========================================
// EstrichManager - Audit log
// ==========================================
// Every write through the API layer leaves one entry.
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub entity_type: String, // "recipe", "batch", ...
    pub entity_id: String,
    pub action_type: String, // ActionType::as_str
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

// ==========================================
// ActionType
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    // recipes
    CreateRecipe,
    UpdateRecipe,
    LockRecipe,
    ArchiveRecipe,
    ReviseRecipe,
    // batches
    CreateBatch,
    RecordQc,
    ReleaseBatch,
    BlockBatch,
    UnblockBatch,
    ConsumeBatch,
    // test reports
    CreateTestReport,
    RevokeTestReport,
    ExpireTestReports,
    // CAPA
    OpenDeviation,
    RecordRootCause,
    AddCorrectiveAction,
    UpdateCorrectiveAction,
    ScheduleEffectivenessCheck,
    PerformEffectivenessCheck,
    // DoP / calibration / config
    IssueDop,
    RevokeDop,
    RecordCalibration,
    UpdateConfig,
}

impl ActionType {
    /// Database form
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateRecipe => "CreateRecipe",
            ActionType::UpdateRecipe => "UpdateRecipe",
            ActionType::LockRecipe => "LockRecipe",
            ActionType::ArchiveRecipe => "ArchiveRecipe",
            ActionType::ReviseRecipe => "ReviseRecipe",
            ActionType::CreateBatch => "CreateBatch",
            ActionType::RecordQc => "RecordQc",
            ActionType::ReleaseBatch => "ReleaseBatch",
            ActionType::BlockBatch => "BlockBatch",
            ActionType::UnblockBatch => "UnblockBatch",
            ActionType::ConsumeBatch => "ConsumeBatch",
            ActionType::CreateTestReport => "CreateTestReport",
            ActionType::RevokeTestReport => "RevokeTestReport",
            ActionType::ExpireTestReports => "ExpireTestReports",
            ActionType::OpenDeviation => "OpenDeviation",
            ActionType::RecordRootCause => "RecordRootCause",
            ActionType::AddCorrectiveAction => "AddCorrectiveAction",
            ActionType::UpdateCorrectiveAction => "UpdateCorrectiveAction",
            ActionType::ScheduleEffectivenessCheck => "ScheduleEffectivenessCheck",
            ActionType::PerformEffectivenessCheck => "PerformEffectivenessCheck",
            ActionType::IssueDop => "IssueDop",
            ActionType::RevokeDop => "RevokeDop",
            ActionType::RecordCalibration => "RecordCalibration",
            ActionType::UpdateConfig => "UpdateConfig",
        }
    }
}

impl ActionLog {
    /// New entry stamped with the current local time
    pub fn new(action_type: ActionType, entity_type: &str, entity_id: &str, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            payload_json: None,
            detail: None,
        }
    }

    /// Attach a serializable payload
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
