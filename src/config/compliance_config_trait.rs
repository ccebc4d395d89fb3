// ==========================================
// EstrichManager - Compliance config reader trait
// ==========================================
// Read-only view of the compliance settings used by the API layer.
// Implemented by ConfigManager (config_kv table).
// ==========================================

use async_trait::async_trait;
use std::error::Error;

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ComplianceConfigReader
// ==========================================
#[async_trait]
pub trait ComplianceConfigReader: Send + Sync {
    /// Validity of an initial type test in years
    ///
    /// # Default
    /// - 3
    async fn get_itt_validity_years(&self) -> ConfigResult<u32>;

    /// Look-ahead window of the compliance calendar in days
    ///
    /// # Default
    /// - 30
    async fn get_calendar_horizon_days(&self) -> ConfigResult<i64>;

    /// Days between scheduling an effectiveness check and its
    /// default planned date
    ///
    /// # Default
    /// - 90
    async fn get_effectiveness_check_lead_days(&self) -> ConfigResult<i64>;
}
