// ==========================================
// EstrichManager - Number sequence store
// ==========================================
// One row per (scope, period). The increment runs inside
// BEGIN IMMEDIATE, so callers on other connections (threads or
// processes) wait for the write lock and never share a value.
// ==========================================

use crate::engine::numbering::SequenceKey;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

pub struct SequenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SequenceRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Next value of the sequence
    ///
    /// `floor` is the highest value already in use outside the store
    /// (e.g. rows written before the sequence existed); the returned
    /// value is always greater than it and than every earlier result.
    pub fn next_value(&self, key: &SequenceKey, floor: u32) -> RepositoryResult<u32> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let value: u32 = tx.query_row(
            r#"
            INSERT INTO number_sequence (scope, period, last_value)
            VALUES (?1, ?2, ?3 + 1)
            ON CONFLICT(scope, period) DO UPDATE SET
                last_value = MAX(number_sequence.last_value + 1, excluded.last_value)
            RETURNING last_value
            "#,
            params![key.scope, key.period, floor],
            |row| row.get(0),
        )?;

        tx.commit()?;
        Ok(value)
    }

    /// Last issued value (None if the sequence was never used)
    pub fn current_value(&self, key: &SequenceKey) -> RepositoryResult<Option<u32>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT last_value FROM number_sequence WHERE scope = ?1 AND period = ?2",
                params![key.scope, key.period],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}
