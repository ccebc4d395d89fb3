// ==========================================
// EstrichManager - Test report repository
// ==========================================

use crate::domain::test_report::TestReport;
use crate::domain::types::{TestReportStatus, TestReportType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{enum_column, json_column, to_json};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const REPORT_COLUMNS: &str = r#"
    id, recipe_id, report_number, report_type, test_date, valid_until,
    laboratory, results_json, status, revoked_reason, created_by, created_at
"#;

pub struct TestReportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TestReportRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, report: &TestReport) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO test_report ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                REPORT_COLUMNS
            ),
            params![
                report.id,
                report.recipe_id,
                report.report_number,
                report.report_type.as_str(),
                report.test_date,
                report.valid_until,
                report.laboratory,
                to_json(&report.results)?,
                report.status.as_str(),
                report.revoked_reason,
                report.created_by,
                report.created_at,
            ],
        )?;
        Ok(())
    }

    /// Revoke a report that is not revoked yet
    pub fn revoke(&self, id: &str, reason: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE test_report SET status = 'revoked', revoked_reason = ?2 WHERE id = ?1 AND status != 'revoked'",
            params![id, reason],
        )?;
        Ok(rows == 1)
    }

    /// Mark valid reports with `valid_until < today` as expired
    ///
    /// # Returns
    /// ids of the reports that were expired
    pub fn expire_before(&self, today: NaiveDate) -> RepositoryResult<Vec<String>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let ids = {
            let mut stmt = tx.prepare(
                "SELECT id FROM test_report WHERE status = 'valid' AND valid_until IS NOT NULL AND valid_until < ?1 ORDER BY valid_until",
            )?;
            let ids = stmt
                .query_map(params![today], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            ids
        };

        tx.execute(
            "UPDATE test_report SET status = 'expired' WHERE status = 'valid' AND valid_until IS NOT NULL AND valid_until < ?1",
            params![today],
        )?;
        tx.commit()?;
        Ok(ids)
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<TestReport>> {
        let conn = self.get_conn()?;
        let report = conn
            .query_row(
                &format!("SELECT {} FROM test_report WHERE id = ?1", REPORT_COLUMNS),
                params![id],
                map_report_row,
            )
            .optional()?;
        Ok(report)
    }

    /// Reports of a recipe, oldest test first
    pub fn list_by_recipe(&self, recipe_id: &str) -> RepositoryResult<Vec<TestReport>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM test_report WHERE recipe_id = ?1 ORDER BY test_date, report_number",
            REPORT_COLUMNS
        ))?;
        let reports = stmt
            .query_map(params![recipe_id], map_report_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    /// Valid reports expiring on or before `until` (compliance calendar)
    pub fn list_valid_expiring_until(&self, until: NaiveDate) -> RepositoryResult<Vec<TestReport>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM test_report WHERE status = 'valid' AND valid_until IS NOT NULL AND valid_until <= ?1 ORDER BY valid_until",
            REPORT_COLUMNS
        ))?;
        let reports = stmt
            .query_map(params![until], map_report_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reports)
    }
}

fn map_report_row(row: &Row<'_>) -> rusqlite::Result<TestReport> {
    Ok(TestReport {
        id: row.get(0)?,
        recipe_id: row.get(1)?,
        report_number: row.get(2)?,
        report_type: enum_column(row, 3, TestReportType::from_db_str)?,
        test_date: row.get(4)?,
        valid_until: row.get(5)?,
        laboratory: row.get(6)?,
        results: json_column(row, 7)?,
        status: enum_column(row, 8, TestReportStatus::from_db_str)?,
        revoked_reason: row.get(9)?,
        created_by: row.get(10)?,
        created_at: row.get(11)?,
    })
}
