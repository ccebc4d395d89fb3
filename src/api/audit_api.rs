// ==========================================
// EstrichManager - Audit trail API
// ==========================================
// Read-only view over action_log for FPC audits:
// who changed what, and when.
// ==========================================

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::api::error::{required, ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::repository::action_log_repo::ActionLogRepository;

/// Largest page returned by the list queries
pub const MAX_AUDIT_LIMIT: i32 = 1000;

pub struct AuditApi {
    action_log_repo: Arc<ActionLogRepository>,
}

impl AuditApi {
    pub fn new(action_log_repo: Arc<ActionLogRepository>) -> Self {
        Self { action_log_repo }
    }

    pub fn get_entry(&self, action_id: &str) -> ApiResult<ActionLog> {
        self.action_log_repo
            .find_by_id(action_id)?
            .ok_or_else(|| ApiError::NotFound(format!("action log entry {}", action_id)))
    }

    /// Full history of one record, oldest first
    pub fn entity_history(&self, entity_type: &str, entity_id: &str) -> ApiResult<Vec<ActionLog>> {
        let entity_type = required(entity_type, "entity_type")?;
        let entity_id = required(entity_id, "entity_id")?;
        let logs = self
            .action_log_repo
            .find_by_entity(&entity_type, &entity_id)?;
        debug!(entity_type = %entity_type, entity_id = %entity_id, count = logs.len(), "entity history read");
        Ok(logs)
    }

    /// Latest entries written by one actor, newest first
    pub fn actor_activity(&self, actor: &str, limit: i32) -> ApiResult<Vec<ActionLog>> {
        let actor = required(actor, "actor")?;
        let limit = check_limit(limit)?;
        Ok(self.action_log_repo.find_by_actor(&actor, limit)?)
    }

    /// Latest entries of one kind, e.g. every batch release
    pub fn actions_of_type(
        &self,
        action_type: ActionType,
        limit: i32,
    ) -> ApiResult<Vec<ActionLog>> {
        let limit = check_limit(limit)?;
        Ok(self
            .action_log_repo
            .find_by_action_type(action_type.as_str(), limit)?)
    }

    /// Entries within `[from, to]`, newest first
    pub fn activity_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> ApiResult<Vec<ActionLog>> {
        if to < from {
            return Err(ApiError::InvalidInput(format!(
                "audit window ends ({}) before it starts ({})",
                to, from
            )));
        }
        Ok(self.action_log_repo.find_by_time_range(from, to)?)
    }

    pub fn recent_activity(&self, limit: i32) -> ApiResult<Vec<ActionLog>> {
        let limit = check_limit(limit)?;
        Ok(self.action_log_repo.find_recent(limit)?)
    }
}

fn check_limit(limit: i32) -> ApiResult<i32> {
    if (1..=MAX_AUDIT_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(ApiError::InvalidInput(format!(
            "limit must be between 1 and {}, got {}",
            MAX_AUDIT_LIMIT, limit
        )))
    }
}
