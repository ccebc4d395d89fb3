// ==========================================
// EstrichManager - Calibration record repository
// ==========================================
// Records are append-only; the latest per equipment counts.
// ==========================================

use crate::domain::calibration::CalibrationRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const CALIBRATION_COLUMNS: &str = r#"
    id, equipment_id, equipment_name, calibrated_on, interval_months, next_due,
    performed_by, certificate_ref, passed, created_at
"#;

pub struct CalibrationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CalibrationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, record: &CalibrationRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO calibration_record ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                CALIBRATION_COLUMNS
            ),
            params![
                record.id,
                record.equipment_id,
                record.equipment_name,
                record.calibrated_on,
                record.interval_months,
                record.next_due,
                record.performed_by,
                record.certificate_ref,
                record.passed,
                record.created_at,
            ],
        )?;
        Ok(())
    }

    /// Most recent calibration of a piece of equipment
    pub fn find_latest(&self, equipment_id: &str) -> RepositoryResult<Option<CalibrationRecord>> {
        let conn = self.get_conn()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {} FROM calibration_record WHERE equipment_id = ?1 ORDER BY calibrated_on DESC, created_at DESC LIMIT 1",
                    CALIBRATION_COLUMNS
                ),
                params![equipment_id],
                map_calibration_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn list_by_equipment(&self, equipment_id: &str) -> RepositoryResult<Vec<CalibrationRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM calibration_record WHERE equipment_id = ?1 ORDER BY calibrated_on",
            CALIBRATION_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![equipment_id], map_calibration_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Latest record of every piece of equipment
    pub fn list_latest(&self) -> RepositoryResult<Vec<CalibrationRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM calibration_record c
            WHERE c.calibrated_on = (
                SELECT MAX(calibrated_on) FROM calibration_record WHERE equipment_id = c.equipment_id
            )
            ORDER BY next_due
            "#,
            CALIBRATION_COLUMNS
        ))?;
        let records = stmt
            .query_map([], map_calibration_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn map_calibration_row(row: &Row<'_>) -> rusqlite::Result<CalibrationRecord> {
    Ok(CalibrationRecord {
        id: row.get(0)?,
        equipment_id: row.get(1)?,
        equipment_name: row.get(2)?,
        calibrated_on: row.get(3)?,
        interval_months: row.get(4)?,
        next_due: row.get(5)?,
        performed_by: row.get(6)?,
        certificate_ref: row.get(7)?,
        passed: row.get(8)?,
        created_at: row.get(9)?,
    })
}
