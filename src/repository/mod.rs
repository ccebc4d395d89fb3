// ==========================================
// EstrichManager - Repository layer
// ==========================================
// Rule: no business logic, data mapping only
// Rule: parameterised SQL only
// ==========================================

pub mod action_log_repo;
pub mod batch_repo;
pub mod calibration_repo;
pub mod deviation_repo;
pub mod dop_repo;
pub mod error;
pub mod recipe_repo;
pub(crate) mod row_mapping;
pub mod sequence_repo;
pub mod test_report_repo;

pub use action_log_repo::ActionLogRepository;
pub use batch_repo::{BatchRepository, BatchStatusChange};
pub use calibration_repo::CalibrationRepository;
pub use deviation_repo::{DeviationRepository, DeviationStatusChange};
pub use dop_repo::DopRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use recipe_repo::RecipeRepository;
pub use sequence_repo::SequenceRepository;
pub use test_report_repo::TestReportRepository;
