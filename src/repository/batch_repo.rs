// ==========================================
// EstrichManager - Batch repository
// ==========================================
// Rule: no business logic. Status writes are guarded by the
// expected current status so a concurrent transition loses cleanly.
// ==========================================

use crate::domain::batch::{Batch, QcData};
use crate::domain::types::BatchStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{enum_column, json_column, to_json};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const BATCH_COLUMNS: &str = r#"
    id, batch_number, recipe_id, production_date, quantity_t, qc_data_json,
    status, blocked_reason, released_by, released_at, created_by, created_at, updated_at
"#;

/// Status change written by `update_status`
#[derive(Debug, Clone)]
pub struct BatchStatusChange<'a> {
    pub from: BatchStatus,
    pub to: BatchStatus,
    pub blocked_reason: Option<&'a str>,
    pub released_by: Option<&'a str>,
    pub at: NaiveDateTime,
}

pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BatchRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // writes
    // ==========================================

    pub fn insert(&self, batch: &Batch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO batch ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                BATCH_COLUMNS
            ),
            params![
                batch.id,
                batch.batch_number,
                batch.recipe_id,
                batch.production_date,
                batch.quantity_t,
                to_json(&batch.qc_data)?,
                batch.status.as_str(),
                batch.blocked_reason,
                batch.released_by,
                batch.released_at,
                batch.created_by,
                batch.created_at,
                batch.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Replace the QC data while the batch is still in `expected`
    pub fn update_qc_data(
        &self,
        id: &str,
        expected: BatchStatus,
        qc_data: &QcData,
        at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE batch SET qc_data_json = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
            params![id, expected.as_str(), to_json(qc_data)?, at],
        )?;
        Ok(rows == 1)
    }

    /// Apply a status change; false if the batch was no longer in `change.from`
    ///
    /// `blocked_reason` is overwritten (cleared when None). Release
    /// metadata is only written when `released_by` is given.
    pub fn update_status(&self, id: &str, change: &BatchStatusChange<'_>) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let released_at = change.released_by.map(|_| change.at);
        let rows = conn.execute(
            r#"
            UPDATE batch SET
                status = ?3,
                blocked_reason = ?4,
                released_by = COALESCE(?5, released_by),
                released_at = COALESCE(?6, released_at),
                updated_at = ?7
            WHERE id = ?1 AND status = ?2
            "#,
            params![
                id,
                change.from.as_str(),
                change.to.as_str(),
                change.blocked_reason,
                change.released_by,
                released_at,
                change.at,
            ],
        )?;
        Ok(rows == 1)
    }

    // ==========================================
    // reads
    // ==========================================

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Batch>> {
        let conn = self.get_conn()?;
        let batch = conn
            .query_row(
                &format!("SELECT {} FROM batch WHERE id = ?1", BATCH_COLUMNS),
                params![id],
                map_batch_row,
            )
            .optional()?;
        Ok(batch)
    }

    pub fn find_by_number(&self, batch_number: &str) -> RepositoryResult<Option<Batch>> {
        let conn = self.get_conn()?;
        let batch = conn
            .query_row(
                &format!("SELECT {} FROM batch WHERE batch_number = ?1", BATCH_COLUMNS),
                params![batch_number],
                map_batch_row,
            )
            .optional()?;
        Ok(batch)
    }

    /// Batches filtered by recipe and/or status, newest production date first
    pub fn list(
        &self,
        recipe_id: Option<&str>,
        status: Option<BatchStatus>,
    ) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM batch
            WHERE (?1 IS NULL OR recipe_id = ?1) AND (?2 IS NULL OR status = ?2)
            ORDER BY production_date DESC, batch_number DESC
            "#,
            BATCH_COLUMNS
        ))?;
        let batches = stmt
            .query_map(params![recipe_id, status.map(|s| s.as_str())], map_batch_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(batches)
    }

    /// Batch numbers of one recipe and production day (sequence seeding)
    pub fn numbers_for_day(
        &self,
        recipe_id: &str,
        production_date: NaiveDate,
    ) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT batch_number FROM batch WHERE recipe_id = ?1 AND production_date = ?2",
        )?;
        let numbers = stmt
            .query_map(params![recipe_id, production_date], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(numbers)
    }
}

fn map_batch_row(row: &Row<'_>) -> rusqlite::Result<Batch> {
    Ok(Batch {
        id: row.get(0)?,
        batch_number: row.get(1)?,
        recipe_id: row.get(2)?,
        production_date: row.get(3)?,
        quantity_t: row.get(4)?,
        qc_data: json_column(row, 5)?,
        status: enum_column(row, 6, BatchStatus::from_db_str)?,
        blocked_reason: row.get(7)?,
        released_by: row.get(8)?,
        released_at: row.get(9)?,
        created_by: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}
