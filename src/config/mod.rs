// ==========================================
// EstrichManager - Configuration layer
// ==========================================
// Storage: config_kv table, scope 'global'
// ==========================================

pub mod compliance_config_trait;
pub mod config_manager;

pub use compliance_config_trait::{ComplianceConfigReader, ConfigResult};
pub use config_manager::{config_keys, ConfigManager};
