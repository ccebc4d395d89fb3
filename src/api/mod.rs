// ==========================================
// EstrichManager - API layer
// ==========================================
// Business operations exposed to the application shell
// ==========================================

pub mod audit_api;
pub mod batch_api;
pub mod calendar_api;
pub mod calibration_api;
pub mod config_api;
pub mod deviation_api;
pub mod dop_api;
pub mod error;
pub mod recipe_api;
pub mod test_report_api;

pub use audit_api::AuditApi;
pub use batch_api::BatchApi;
pub use calendar_api::CalendarApi;
pub use calibration_api::CalibrationApi;
pub use config_api::{ConfigApi, ConfigItem};
pub use deviation_api::DeviationApi;
pub use dop_api::DopApi;
pub use error::{ApiError, ApiResult};
pub use recipe_api::RecipeApi;
pub use test_report_api::TestReportApi;
