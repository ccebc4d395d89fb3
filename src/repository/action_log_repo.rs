// ==========================================
// EstrichManager - Audit log repository
// ==========================================
// Table: action_log (one row per write through the API layer)
// Rule: append-only, entries are never updated or deleted
// ==========================================

mod core;
mod queries;


pub use self::core::ActionLogRepository;
