// ==========================================
// EstrichManager - Configuration API
// ==========================================
// Responsibilities: read / update global settings, snapshots
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::api::error::{required, ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::repository::action_log_repo::ActionLogRepository;

/// One global setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    pub value: String,
}

pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>, action_log_repo: Arc<ActionLogRepository>) -> Self {
        Self {
            config_manager,
            action_log_repo,
        }
    }

    /// All stored global settings, sorted by key
    pub fn list_configs(&self) -> ApiResult<Vec<ConfigItem>> {
        let snapshot = self.snapshot()?;
        let map: BTreeMap<String, String> =
            serde_json::from_str(&snapshot).map_err(|e| ApiError::ConfigError(e.to_string()))?;
        Ok(map
            .into_iter()
            .map(|(key, value)| ConfigItem { key, value })
            .collect())
    }

    pub fn get_config(&self, key: &str) -> ApiResult<Option<ConfigItem>> {
        let key = required(key, "key")?;
        let value = self
            .config_manager
            .get_global_config_value(&key)
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        Ok(value.map(|value| ConfigItem { key, value }))
    }

    /// Update one setting; numeric keys are validated by ConfigManager
    pub fn update_config(&self, key: &str, value: &str, actor: &str, reason: &str) -> ApiResult<()> {
        let actor = required(actor, "actor")?;
        let key = required(key, "key")?;
        let reason = required(reason, "reason")?;

        self.config_manager
            .set_global_config_value(&key, value)
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::UpdateConfig, "config", &key, &actor)
                .with_payload(&json!({ "key": key, "value": value.trim(), "reason": reason }))
                .with_detail(format!("{} = {}", key, value.trim())),
        )?;

        info!(key = %key, value = %value.trim(), "config updated");
        Ok(())
    }

    /// JSON object of all global settings
    pub fn snapshot(&self) -> ApiResult<String> {
        self.config_manager
            .get_config_snapshot()
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    /// Write every key of a snapshot back; returns the number of keys written
    pub fn restore_snapshot(&self, snapshot_json: &str, actor: &str, reason: &str) -> ApiResult<usize> {
        let actor = required(actor, "actor")?;
        let reason = required(reason, "reason")?;

        let count = self
            .config_manager
            .restore_config_from_snapshot(snapshot_json)
            .map_err(|e| ApiError::InvalidInput(format!("invalid config snapshot: {}", e)))?;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::UpdateConfig, "config", "global", &actor)
                .with_payload(&json!({ "restored_keys": count, "reason": reason }))
                .with_detail(format!("restored {} keys from snapshot", count)),
        )?;

        info!(count, "config restored from snapshot");
        Ok(count)
    }
}
