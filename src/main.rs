// ==========================================
// EstrichManager - Command line entry
// ==========================================
// Opens the database, persists expired test reports and
// prints the compliance calendar for today.
// ==========================================

use anyhow::{anyhow, Context};
use chrono::Local;

use estrich_manager::app::{get_default_db_path, AppState};
use estrich_manager::logging;

/// Actor recorded for maintenance runs
const SYSTEM_ACTOR: &str = "system";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} {}", estrich_manager::APP_NAME, estrich_manager::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!(db_path = %db_path, "using database");

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;
    let today = Local::now().date_naive();

    let expired = state
        .test_report_api
        .expire_overdue(today, SYSTEM_ACTOR)
        .context("expiring test reports")?;
    if expired > 0 {
        tracing::warn!(expired, "test reports passed their validity date");
    }

    let entries = state
        .calendar_api
        .get_calendar(today, None)
        .await
        .context("building compliance calendar")?;

    if entries.is_empty() {
        tracing::info!("no compliance dates in the look-ahead window");
    }
    for entry in &entries {
        if entry.overdue {
            tracing::warn!(date = %entry.date, kind = ?entry.kind, "OVERDUE: {}", entry.title);
        } else {
            tracing::info!(date = %entry.date, kind = ?entry.kind, "{}", entry.title);
        }
    }

    Ok(())
}
