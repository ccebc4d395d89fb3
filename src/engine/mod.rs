// ==========================================
// EstrichManager - Engine layer
// ==========================================
// Pure compliance rules: no SQL, no I/O.
// Every rejection carries a reason (issue list or typed error).
// ==========================================

pub mod batch_state;
pub mod capa_workflow;
pub mod compliance_calendar;
pub mod dop_generator;
pub mod numbering;
pub mod qc_gate;
pub mod test_report_validity;
pub mod transition;

// Re-export the engines
pub use batch_state::{BatchStateMachine, BatchTransition, ReleaseDecision};
pub use capa_workflow::{ActionOperation, CapaEvent, CapaWorkflow};
pub use compliance_calendar::{CalendarSources, ComplianceCalendar};
pub use dop_generator::{DopContent, DopGenerator, DopInput, DopPrerequisiteError};
pub use numbering::{normalize_recipe_code, Numbering, SequenceKey};
pub use qc_gate::{BatchQcGate, QcCharacteristic, QcIssue, QcIssueKind, QcValidation};
pub use test_report_validity::{TestReportValidity, ValidityOutOfRange};
pub use transition::TransitionError;
