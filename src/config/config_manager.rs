// ==========================================
// EstrichManager - Configuration manager
// ==========================================
// Storage: config_kv table (scope_id = 'global')
// Unknown or unparsable values fall back to the defaults.
// ==========================================

use crate::config::compliance_config_trait::{ComplianceConfigReader, ConfigResult};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Share an existing connection; the PRAGMAs are re-applied (idempotent)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("failed to acquire lock: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// Raw value of a global key
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("failed to acquire lock: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// Insert or overwrite a global key
    ///
    /// Known numeric keys must hold an integer in `1..=upper_bound(key)`.
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err("config key must not be empty".into());
        }
        validate_value(key, value)?;

        let conn = self.conn.lock().map_err(|e| format!("failed to acquire lock: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value.trim()],
        )?;
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_global_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// All global values as a JSON object (sorted by key)
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("failed to acquire lock: {}", e))?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// Restore global values from a snapshot
    ///
    /// # Returns
    /// - number of keys written
    ///
    /// Keys missing from the snapshot are left untouched. Every value is
    /// validated before anything is written.
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ConfigResult<usize> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;
        for (key, value) in &config_map {
            validate_value(key, value)?;
        }

        let mut conn = self.conn.lock().map_err(|e| format!("failed to acquire lock: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// ComplianceConfigReader implementation
// ==========================================
#[async_trait]
impl ComplianceConfigReader for ConfigManager {
    async fn get_itt_validity_years(&self) -> ConfigResult<u32> {
        let value = self.get_config_or_default(config_keys::ITT_VALIDITY_YEARS, "3")?;
        Ok(bounded(config_keys::ITT_VALIDITY_YEARS, &value).unwrap_or(3))
    }

    async fn get_calendar_horizon_days(&self) -> ConfigResult<i64> {
        let value = self.get_config_or_default(config_keys::CALENDAR_HORIZON_DAYS, "30")?;
        Ok(bounded(config_keys::CALENDAR_HORIZON_DAYS, &value).map_or(30, i64::from))
    }

    async fn get_effectiveness_check_lead_days(&self) -> ConfigResult<i64> {
        let value = self.get_config_or_default(config_keys::EFFECTIVENESS_CHECK_LEAD_DAYS, "90")?;
        Ok(bounded(config_keys::EFFECTIVENESS_CHECK_LEAD_DAYS, &value).map_or(90, i64::from))
    }
}

/// Parsed numeric value within `1..=upper_bound(key)`
fn bounded(key: &str, value: &str) -> Option<u32> {
    let max = config_keys::upper_bound(key)?;
    value.trim().parse::<u32>().ok().filter(|v| (1..=max).contains(v))
}

fn validate_value(key: &str, value: &str) -> ConfigResult<()> {
    if let Some(max) = config_keys::upper_bound(key) {
        if bounded(key, value).is_none() {
            return Err(format!("{} must be an integer between 1 and {}, got '{}'", key, max, value).into());
        }
    }
    Ok(())
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    // ===== test reports =====
    pub const ITT_VALIDITY_YEARS: &str = "itt_validity_years";

    // ===== compliance calendar =====
    pub const CALENDAR_HORIZON_DAYS: &str = "calendar_horizon_days";

    // ===== CAPA =====
    pub const EFFECTIVENESS_CHECK_LEAD_DAYS: &str = "effectiveness_check_lead_days";

    /// Longest ITT validity accepted (years)
    pub const MAX_ITT_VALIDITY_YEARS: u32 = 50;

    /// Longest look-ahead / lead time accepted (days)
    pub const MAX_WINDOW_DAYS: u32 = 3650;

    /// Upper bound of a numeric key; None for free-form keys
    pub fn upper_bound(key: &str) -> Option<u32> {
        match key {
            ITT_VALIDITY_YEARS => Some(MAX_ITT_VALIDITY_YEARS),
            CALENDAR_HORIZON_DAYS | EFFECTIVENESS_CHECK_LEAD_DAYS => Some(MAX_WINDOW_DAYS),
            _ => None,
        }
    }
}
