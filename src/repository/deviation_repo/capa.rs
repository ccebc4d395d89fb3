use super::deviations::{apply_status_change, DeviationRepository, DeviationStatusChange};
use crate::domain::deviation::{CorrectiveAction, EffectivenessCheck};
use crate::domain::types::{ActionKind, ActionStatus, CheckResult, DeviationStatus};
use crate::repository::error::RepositoryResult;
use crate::repository::row_mapping::enum_column;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

const ACTION_COLUMNS: &str = r#"
    id, deviation_id, kind, description, responsible_person, planned_start, planned_due,
    actual_start, actual_completion, status, completion_note, created_at
"#;

const CHECK_COLUMNS: &str = r#"
    id, deviation_id, success_criteria, planned_date, performed_on, performed_by,
    result, notes, created_at
"#;

impl DeviationRepository {
    // ==========================================
    // corrective actions
    // ==========================================

    /// Insert an action; with `change`, the deviation status moves in the same transaction
    ///
    /// # Returns
    /// - Ok(false): the deviation was no longer in `change.from`, nothing written
    pub fn insert_action(
        &self,
        action: &CorrectiveAction,
        change: Option<DeviationStatusChange>,
    ) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        if let Some(change) = change {
            if !apply_status_change(&tx, &action.deviation_id, change)? {
                return Ok(false);
            }
        }

        tx.execute(
            &format!(
                "INSERT INTO corrective_action ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                ACTION_COLUMNS
            ),
            params![
                action.id,
                action.deviation_id,
                action.kind.as_str(),
                action.description,
                action.responsible_person,
                action.planned_start,
                action.planned_due,
                action.actual_start,
                action.actual_completion,
                action.status.as_str(),
                action.completion_note,
                action.created_at,
            ],
        )?;

        tx.commit()?;
        Ok(true)
    }

    /// Write the progress fields of an action still in `expected`
    ///
    /// Runs under BEGIN IMMEDIATE. After the action row is written,
    /// `derive` sees the deviation status and all actions as stored
    /// inside the transaction and returns the deviation target, if any.
    ///
    /// # Returns
    /// - Ok(None): the action was no longer in `expected`, nothing written
    /// - Ok(Some(status)): deviation status after the write
    pub fn update_action<F>(
        &self,
        action: &CorrectiveAction,
        expected: ActionStatus,
        at: NaiveDateTime,
        derive: F,
    ) -> RepositoryResult<Option<DeviationStatus>>
    where
        F: FnOnce(DeviationStatus, &[CorrectiveAction]) -> Option<DeviationStatus>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let rows = tx.execute(
            r#"
            UPDATE corrective_action SET
                status = ?3, actual_start = ?4, actual_completion = ?5, completion_note = ?6
            WHERE id = ?1 AND status = ?2
            "#,
            params![
                action.id,
                expected.as_str(),
                action.status.as_str(),
                action.actual_start,
                action.actual_completion,
                action.completion_note,
            ],
        )?;
        if rows != 1 {
            return Ok(None);
        }

        let current: DeviationStatus = tx.query_row(
            "SELECT status FROM deviation WHERE id = ?1",
            params![action.deviation_id],
            |row| enum_column(row, 0, DeviationStatus::from_db_str),
        )?;
        let actions = list_actions_on(&tx, &action.deviation_id)?;

        let status = match derive(current, &actions) {
            Some(to) if to != current => {
                let change = DeviationStatusChange { from: current, to, at };
                if !apply_status_change(&tx, &action.deviation_id, change)? {
                    return Ok(None);
                }
                to
            }
            _ => current,
        };

        tx.commit()?;
        Ok(Some(status))
    }

    pub fn find_action(&self, id: &str) -> RepositoryResult<Option<CorrectiveAction>> {
        let conn = self.get_conn()?;
        let action = conn
            .query_row(
                &format!("SELECT {} FROM corrective_action WHERE id = ?1", ACTION_COLUMNS),
                params![id],
                map_action_row,
            )
            .optional()?;
        Ok(action)
    }

    pub fn list_actions(&self, deviation_id: &str) -> RepositoryResult<Vec<CorrectiveAction>> {
        let conn = self.get_conn()?;
        list_actions_on(&conn, deviation_id)
    }

    /// Open actions due on or before `until`, with their deviation number
    pub fn list_open_actions_due(
        &self,
        until: NaiveDate,
    ) -> RepositoryResult<Vec<(CorrectiveAction, String)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT a.id, a.deviation_id, a.kind, a.description, a.responsible_person,
                   a.planned_start, a.planned_due, a.actual_start, a.actual_completion,
                   a.status, a.completion_note, a.created_at, d.deviation_number
            FROM corrective_action a
            JOIN deviation d ON d.id = a.deviation_id
            WHERE a.status IN ('planned', 'in_progress') AND a.planned_due <= ?1
            ORDER BY a.planned_due
            "#,
        )?;
        let rows = stmt
            .query_map(params![until], |row| Ok((map_action_row(row)?, row.get(12)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ==========================================
    // effectiveness checks
    // ==========================================

    pub fn insert_check(
        &self,
        check: &EffectivenessCheck,
        change: Option<DeviationStatusChange>,
    ) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        if let Some(change) = change {
            if !apply_status_change(&tx, &check.deviation_id, change)? {
                return Ok(false);
            }
        }

        tx.execute(
            &format!(
                "INSERT INTO effectiveness_check ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                CHECK_COLUMNS
            ),
            params![
                check.id,
                check.deviation_id,
                check.success_criteria,
                check.planned_date,
                check.performed_on,
                check.performed_by,
                check.result.as_str(),
                check.notes,
                check.created_at,
            ],
        )?;

        tx.commit()?;
        Ok(true)
    }

    /// Record the outcome of a pending check and move the deviation
    pub fn record_check_result(
        &self,
        check: &EffectivenessCheck,
        change: DeviationStatusChange,
    ) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            r#"
            UPDATE effectiveness_check SET
                performed_on = ?2, performed_by = ?3, result = ?4, notes = ?5
            WHERE id = ?1 AND result = 'pending'
            "#,
            params![
                check.id,
                check.performed_on,
                check.performed_by,
                check.result.as_str(),
                check.notes,
            ],
        )?;
        if rows != 1 || !apply_status_change(&tx, &check.deviation_id, change)? {
            return Ok(false);
        }

        tx.commit()?;
        Ok(true)
    }

    pub fn find_check(&self, id: &str) -> RepositoryResult<Option<EffectivenessCheck>> {
        let conn = self.get_conn()?;
        let check = conn
            .query_row(
                &format!("SELECT {} FROM effectiveness_check WHERE id = ?1", CHECK_COLUMNS),
                params![id],
                map_check_row,
            )
            .optional()?;
        Ok(check)
    }

    pub fn list_checks(&self, deviation_id: &str) -> RepositoryResult<Vec<EffectivenessCheck>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM effectiveness_check WHERE deviation_id = ?1 ORDER BY planned_date, created_at",
            CHECK_COLUMNS
        ))?;
        let checks = stmt
            .query_map(params![deviation_id], map_check_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(checks)
    }

    /// Pending checks planned on or before `until`, with their deviation number
    pub fn list_pending_checks_due(
        &self,
        until: NaiveDate,
    ) -> RepositoryResult<Vec<(EffectivenessCheck, String)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.id, c.deviation_id, c.success_criteria, c.planned_date, c.performed_on,
                   c.performed_by, c.result, c.notes, c.created_at, d.deviation_number
            FROM effectiveness_check c
            JOIN deviation d ON d.id = c.deviation_id
            WHERE c.result = 'pending' AND c.planned_date <= ?1
            ORDER BY c.planned_date
            "#,
        )?;
        let rows = stmt
            .query_map(params![until], |row| Ok((map_check_row(row)?, row.get(9)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn list_actions_on(conn: &Connection, deviation_id: &str) -> RepositoryResult<Vec<CorrectiveAction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM corrective_action WHERE deviation_id = ?1 ORDER BY planned_due, created_at",
        ACTION_COLUMNS
    ))?;
    let actions = stmt
        .query_map(params![deviation_id], map_action_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(actions)
}

fn map_action_row(row: &Row<'_>) -> rusqlite::Result<CorrectiveAction> {
    Ok(CorrectiveAction {
        id: row.get(0)?,
        deviation_id: row.get(1)?,
        kind: enum_column(row, 2, ActionKind::from_db_str)?,
        description: row.get(3)?,
        responsible_person: row.get(4)?,
        planned_start: row.get(5)?,
        planned_due: row.get(6)?,
        actual_start: row.get(7)?,
        actual_completion: row.get(8)?,
        status: enum_column(row, 9, ActionStatus::from_db_str)?,
        completion_note: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn map_check_row(row: &Row<'_>) -> rusqlite::Result<EffectivenessCheck> {
    Ok(EffectivenessCheck {
        id: row.get(0)?,
        deviation_id: row.get(1)?,
        success_criteria: row.get(2)?,
        planned_date: row.get(3)?,
        performed_on: row.get(4)?,
        performed_by: row.get(5)?,
        result: enum_column(row, 6, CheckResult::from_db_str)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
    })
}
