// ==========================================
// Mock compliance config for integration tests
// ==========================================

use async_trait::async_trait;
use estrich_manager::config::{ComplianceConfigReader, ConfigResult};

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub itt_validity_years: u32,
    pub calendar_horizon_days: i64,
    pub effectiveness_check_lead_days: i64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            itt_validity_years: 3,
            calendar_horizon_days: 30,
            effectiveness_check_lead_days: 90,
        }
    }
}

#[async_trait]
impl ComplianceConfigReader for MockConfig {
    async fn get_itt_validity_years(&self) -> ConfigResult<u32> {
        Ok(self.itt_validity_years)
    }

    async fn get_calendar_horizon_days(&self) -> ConfigResult<i64> {
        Ok(self.calendar_horizon_days)
    }

    async fn get_effectiveness_check_lead_days(&self) -> ConfigResult<i64> {
        Ok(self.effectiveness_check_lead_days)
    }
}
