// ==========================================
// EstrichManager - Domain layer
// ==========================================
// Entities, value types and enums.
// No data access, no business rules beyond simple helpers.
// ==========================================

pub mod action_log;
pub mod batch;
pub mod calendar;
pub mod calibration;
pub mod deviation;
pub mod dop;
pub mod recipe;
pub mod test_report;
pub mod types;

pub use action_log::{ActionLog, ActionType};
pub use batch::{Batch, NewBatch, QcData};
pub use calendar::{days_after, CalendarEntry, CalendarEntryKind};
pub use calibration::{CalibrationRecord, NewCalibration};
pub use deviation::{
    CorrectiveAction, Deviation, DeviationDetail, EffectivenessCheck, NewCorrectiveAction,
    NewDeviation, RootCauseAnalysis,
};
pub use dop::{DeclarationOfPerformance, DeclaredCharacteristic};
pub use recipe::{NewRecipe, Recipe, RecipeUpdate};
pub use test_report::{NewTestReport, TestReport};
pub use types::{
    ActionKind, ActionStatus, AvcpSystem, BatchStatus, BinderType, CheckResult, DeviationSeverity,
    DeviationSource, DeviationStatus, DeviationType, DopStatus, RecipeStatus, RootCauseMethod,
    TestReportStatus, TestReportType,
};
