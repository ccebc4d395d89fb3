// ==========================================
// EstrichManager - Application layer
// ==========================================
// Wires repositories, config and APIs onto one connection
// ==========================================

pub mod state;

pub use state::{get_default_db_path, AppState};
