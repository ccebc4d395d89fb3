// ==========================================
// EstrichManager - DoP repository
// ==========================================
// Issued declarations are immutable; only status/revoked_reason change.
// ==========================================

use crate::domain::dop::DeclarationOfPerformance;
use crate::domain::types::{AvcpSystem, DopStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{enum_column, json_column, to_json};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const DOP_COLUMNS: &str = r#"
    id, dop_number, recipe_id, recipe_version, batch_id, title, product_designation,
    intended_use, manufacturer, avcp_system, notified_body, characteristics_json,
    test_reports_json, language, issued_on, status, revoked_reason, created_by, created_at
"#;

pub struct DopRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DopRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, dop: &DeclarationOfPerformance) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO dop ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
                DOP_COLUMNS
            ),
            params![
                dop.id,
                dop.dop_number,
                dop.recipe_id,
                dop.recipe_version,
                dop.batch_id,
                dop.title,
                dop.product_designation,
                dop.intended_use,
                dop.manufacturer,
                dop.avcp_system.as_str(),
                dop.notified_body,
                to_json(&dop.characteristics)?,
                to_json(&dop.test_report_numbers)?,
                dop.language,
                dop.issued_on,
                dop.status.as_str(),
                dop.revoked_reason,
                dop.created_by,
                dop.created_at,
            ],
        )?;
        Ok(())
    }

    /// Revoke an issued DoP
    pub fn revoke(&self, id: &str, reason: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE dop SET status = 'revoked', revoked_reason = ?2 WHERE id = ?1 AND status = 'issued'",
            params![id, reason],
        )?;
        Ok(rows == 1)
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<DeclarationOfPerformance>> {
        let conn = self.get_conn()?;
        let dop = conn
            .query_row(
                &format!("SELECT {} FROM dop WHERE id = ?1", DOP_COLUMNS),
                params![id],
                map_dop_row,
            )
            .optional()?;
        Ok(dop)
    }

    pub fn find_by_number(&self, dop_number: &str) -> RepositoryResult<Option<DeclarationOfPerformance>> {
        let conn = self.get_conn()?;
        let dop = conn
            .query_row(
                &format!("SELECT {} FROM dop WHERE dop_number = ?1", DOP_COLUMNS),
                params![dop_number],
                map_dop_row,
            )
            .optional()?;
        Ok(dop)
    }

    pub fn list_by_recipe(&self, recipe_id: &str) -> RepositoryResult<Vec<DeclarationOfPerformance>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM dop WHERE recipe_id = ?1 ORDER BY issued_on, dop_number",
            DOP_COLUMNS
        ))?;
        let dops = stmt
            .query_map(params![recipe_id], map_dop_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dops)
    }
}

fn map_dop_row(row: &Row<'_>) -> rusqlite::Result<DeclarationOfPerformance> {
    Ok(DeclarationOfPerformance {
        id: row.get(0)?,
        dop_number: row.get(1)?,
        recipe_id: row.get(2)?,
        recipe_version: row.get(3)?,
        batch_id: row.get(4)?,
        title: row.get(5)?,
        product_designation: row.get(6)?,
        intended_use: row.get(7)?,
        manufacturer: row.get(8)?,
        avcp_system: enum_column(row, 9, AvcpSystem::from_db_str)?,
        notified_body: row.get(10)?,
        characteristics: json_column(row, 11)?,
        test_report_numbers: json_column(row, 12)?,
        language: row.get(13)?,
        issued_on: row.get(14)?,
        status: enum_column(row, 15, DopStatus::from_db_str)?,
        revoked_reason: row.get(16)?,
        created_by: row.get(17)?,
        created_at: row.get(18)?,
    })
}
