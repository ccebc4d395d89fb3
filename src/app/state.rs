// ==========================================
// EstrichManager - Application state
// ==========================================
// All repositories share one SQLite connection; every API
// instance is created once and handed out as Arc.
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{
    AuditApi, BatchApi, CalendarApi, CalibrationApi, ConfigApi, DeviationApi, DopApi, RecipeApi,
    TestReportApi,
};
use crate::config::{ComplianceConfigReader, ConfigManager};
use crate::db;
use crate::repository::{
    ActionLogRepository, BatchRepository, CalibrationRepository, DeviationRepository,
    DopRepository, RecipeRepository, SequenceRepository, TestReportRepository,
};

/// Environment variable overriding the database location
pub const DB_PATH_ENV: &str = "ESTRICH_DB_PATH";

/// Shared application state
pub struct AppState {
    pub db_path: String,

    pub recipe_api: Arc<RecipeApi>,
    pub batch_api: Arc<BatchApi>,
    pub test_report_api: Arc<TestReportApi>,
    pub deviation_api: Arc<DeviationApi>,
    pub dop_api: Arc<DopApi>,
    pub calibration_api: Arc<CalibrationApi>,
    pub calendar_api: Arc<CalendarApi>,
    pub config_api: Arc<ConfigApi>,
    pub audit_api: Arc<AuditApi>,

    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// Open (or create) the database and build every API
    ///
    /// # Errors
    /// - the file cannot be opened or the schema cannot be created
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "initializing AppState");

        let conn = db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("cannot open database {}: {}", db_path, e))?;
        db::ensure_schema(&conn).map_err(|e| format!("cannot create schema: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // repositories
        // ==========================================
        let recipe_repo = Arc::new(RecipeRepository::new(conn.clone()));
        let batch_repo = Arc::new(BatchRepository::new(conn.clone()));
        let report_repo = Arc::new(TestReportRepository::new(conn.clone()));
        let deviation_repo = Arc::new(DeviationRepository::new(conn.clone()));
        let dop_repo = Arc::new(DopRepository::new(conn.clone()));
        let calibration_repo = Arc::new(CalibrationRepository::new(conn.clone()));
        let sequence_repo = Arc::new(SequenceRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("cannot create ConfigManager: {}", e))?,
        );
        let config_reader: Arc<dyn ComplianceConfigReader> = config_manager.clone();

        // ==========================================
        // APIs
        // ==========================================
        let recipe_api = Arc::new(RecipeApi::new(recipe_repo.clone(), action_log_repo.clone()));

        let deviation_api = Arc::new(DeviationApi::new(
            deviation_repo.clone(),
            recipe_repo.clone(),
            batch_repo.clone(),
            sequence_repo.clone(),
            action_log_repo.clone(),
            config_reader.clone(),
        ));

        let batch_api = Arc::new(BatchApi::new(
            batch_repo.clone(),
            recipe_repo.clone(),
            deviation_repo.clone(),
            sequence_repo.clone(),
            action_log_repo.clone(),
            deviation_api.clone(),
        ));

        let test_report_api = Arc::new(TestReportApi::new(
            report_repo.clone(),
            recipe_repo.clone(),
            action_log_repo.clone(),
            config_reader.clone(),
        ));

        let dop_api = Arc::new(DopApi::new(
            dop_repo,
            recipe_repo,
            batch_repo,
            report_repo.clone(),
            sequence_repo,
            action_log_repo.clone(),
        ));

        let calibration_api = Arc::new(CalibrationApi::new(
            calibration_repo.clone(),
            action_log_repo.clone(),
        ));

        let calendar_api = Arc::new(CalendarApi::new(
            report_repo,
            calibration_repo,
            deviation_repo,
            config_reader,
        ));

        let config_api = Arc::new(ConfigApi::new(config_manager, action_log_repo.clone()));
        let audit_api = Arc::new(AuditApi::new(action_log_repo.clone()));

        tracing::info!("AppState ready");

        Ok(Self {
            db_path,
            recipe_api,
            batch_api,
            test_report_api,
            deviation_api,
            dop_api,
            calibration_api,
            calendar_api,
            config_api,
            audit_api,
            action_log_repo,
        })
    }
}

/// Database location
///
/// `ESTRICH_DB_PATH` wins; otherwise `<data dir>/estrich-manager/estrich.db`,
/// falling back to `./estrich.db` when no data dir is known.
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    match dirs::data_dir() {
        Some(data_dir) => {
            let dir = data_dir.join("estrich-manager");
            // a missing directory surfaces later as an open error
            std::fs::create_dir_all(&dir).ok();
            dir.join("estrich.db").to_string_lossy().to_string()
        }
        None => "./estrich.db".to_string(),
    }
}
