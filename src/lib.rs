// ==========================================
// EstrichManager - Core library
// ==========================================
// EN 13813 screed compliance: recipes, batch release,
// test reports, CAPA, declarations of performance,
// calibration and the compliance calendar.
// Stack: Rust + SQLite
// ==========================================

// Localized messages (en, de)
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// Modules
// ==========================================

// Domain - entities and types
pub mod domain;

// Repositories - data access
pub mod repository;

// Engine - business rules
pub mod engine;

// Configuration
pub mod config;

// Database setup (connection PRAGMAs, schema)
pub mod db;

// Logging
pub mod logging;

// Internationalization
pub mod i18n;

// API - business operations
pub mod api;

// Application wiring
pub mod app;

// ==========================================
// Re-exports
// ==========================================

pub use domain::types::{
    AvcpSystem, BatchStatus, BinderType, DeviationSeverity, DeviationStatus, RecipeStatus,
    TestReportStatus, TestReportType,
};

pub use domain::{
    ActionLog, ActionType, Batch, CalendarEntry, CalibrationRecord, CorrectiveAction,
    DeclarationOfPerformance, Deviation, EffectivenessCheck, QcData, Recipe, TestReport,
};

pub use engine::{
    BatchQcGate, BatchStateMachine, CapaWorkflow, ComplianceCalendar, DopGenerator, Numbering,
    TestReportValidity,
};

pub use api::{
    ApiError, ApiResult, AuditApi, BatchApi, CalendarApi, CalibrationApi, ConfigApi, DeviationApi, DopApi,
    RecipeApi, TestReportApi,
};

pub use app::AppState;

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "EstrichManager";
