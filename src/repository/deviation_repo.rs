// ==========================================
// EstrichManager - Deviation / CAPA repository
// ==========================================
// Tables: deviation, corrective_action, effectiveness_check
// Child writes that change the deviation status run in one
// transaction together with the guarded status update.
// ==========================================

mod capa;
mod deviations;


pub use self::deviations::{DeviationRepository, DeviationStatusChange};
