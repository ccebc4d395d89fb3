use crate::domain::deviation::{Deviation, RootCauseAnalysis};
use crate::domain::types::{DeviationSeverity, DeviationSource, DeviationStatus, DeviationType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{enum_column, opt_json_column, to_json};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const DEVIATION_COLUMNS: &str = r#"
    id, deviation_number, title, description, deviation_type, severity, source,
    status, recipe_id, batch_id, root_cause_json, created_by, created_at, updated_at, closed_at
"#;

/// Guarded status update applied together with a write
#[derive(Debug, Clone, Copy)]
pub struct DeviationStatusChange {
    pub from: DeviationStatus,
    pub to: DeviationStatus,
    pub at: NaiveDateTime,
}

pub struct DeviationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DeviationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // deviation writes
    // ==========================================

    pub fn insert(&self, deviation: &Deviation) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let root_cause = deviation.root_cause.as_ref().map(to_json).transpose()?;
        conn.execute(
            &format!(
                "INSERT INTO deviation ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                DEVIATION_COLUMNS
            ),
            params![
                deviation.id,
                deviation.deviation_number,
                deviation.title,
                deviation.description,
                deviation.deviation_type.as_str(),
                deviation.severity.as_str(),
                deviation.source.as_str(),
                deviation.status.as_str(),
                deviation.recipe_id,
                deviation.batch_id,
                root_cause,
                deviation.created_by,
                deviation.created_at,
                deviation.updated_at,
                deviation.closed_at,
            ],
        )?;
        Ok(())
    }

    /// Store the root-cause analysis and move the status
    pub fn set_root_cause(
        &self,
        id: &str,
        analysis: &RootCauseAnalysis,
        change: DeviationStatusChange,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE deviation SET root_cause_json = ?3, status = ?4, updated_at = ?5
            WHERE id = ?1 AND status = ?2
            "#,
            params![
                id,
                change.from.as_str(),
                to_json(analysis)?,
                change.to.as_str(),
                change.at,
            ],
        )?;
        Ok(rows == 1)
    }

    /// Guarded status update on its own
    pub fn update_status(&self, id: &str, change: DeviationStatusChange) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        Ok(apply_status_change(&conn, id, change)?)
    }

    // ==========================================
    // deviation reads
    // ==========================================

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Deviation>> {
        let conn = self.get_conn()?;
        let deviation = conn
            .query_row(
                &format!("SELECT {} FROM deviation WHERE id = ?1", DEVIATION_COLUMNS),
                params![id],
                map_deviation_row,
            )
            .optional()?;
        Ok(deviation)
    }

    pub fn find_by_number(&self, deviation_number: &str) -> RepositoryResult<Option<Deviation>> {
        let conn = self.get_conn()?;
        let deviation = conn
            .query_row(
                &format!(
                    "SELECT {} FROM deviation WHERE deviation_number = ?1",
                    DEVIATION_COLUMNS
                ),
                params![deviation_number],
                map_deviation_row,
            )
            .optional()?;
        Ok(deviation)
    }

    /// Deviations, optionally by status, newest first
    pub fn list(&self, status: Option<DeviationStatus>) -> RepositoryResult<Vec<Deviation>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM deviation WHERE (?1 IS NULL OR status = ?1) ORDER BY created_at DESC, deviation_number DESC",
            DEVIATION_COLUMNS
        ))?;
        let deviations = stmt
            .query_map(params![status.map(|s| s.as_str())], map_deviation_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(deviations)
    }

    /// Numbers of unclosed deviations linked to a batch
    pub fn open_numbers_for_batch(&self, batch_id: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT deviation_number FROM deviation WHERE batch_id = ?1 AND status != 'closed' ORDER BY deviation_number",
        )?;
        let numbers = stmt
            .query_map(params![batch_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(numbers)
    }
}

/// `UPDATE deviation SET status ... WHERE status = from`; closed_at is set when closing
pub(super) fn apply_status_change(
    conn: &Connection,
    id: &str,
    change: DeviationStatusChange,
) -> rusqlite::Result<bool> {
    let closed_at = change.to.is_closed().then_some(change.at);
    let rows = conn.execute(
        r#"
        UPDATE deviation SET status = ?3, updated_at = ?4, closed_at = COALESCE(?5, closed_at)
        WHERE id = ?1 AND status = ?2
        "#,
        params![id, change.from.as_str(), change.to.as_str(), change.at, closed_at],
    )?;
    Ok(rows == 1)
}

fn map_deviation_row(row: &Row<'_>) -> rusqlite::Result<Deviation> {
    Ok(Deviation {
        id: row.get(0)?,
        deviation_number: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        deviation_type: enum_column(row, 4, DeviationType::from_db_str)?,
        severity: enum_column(row, 5, DeviationSeverity::from_db_str)?,
        source: enum_column(row, 6, DeviationSource::from_db_str)?,
        status: enum_column(row, 7, DeviationStatus::from_db_str)?,
        recipe_id: row.get(8)?,
        batch_id: row.get(9)?,
        root_cause: opt_json_column(row, 10)?,
        created_by: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
        closed_at: row.get(14)?,
    })
}
