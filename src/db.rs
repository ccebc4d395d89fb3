// ==========================================
// EstrichManager - SQLite connection setup
// ==========================================
// Goals:
// - every Connection::open goes through the same PRAGMAs
//   (foreign keys must be enabled per connection)
// - one busy_timeout so concurrent writers wait instead of failing
// - one idempotent schema for the binary and the tests
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// Default busy_timeout (ms)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// schema_version written by `ensure_schema`
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Apply the shared PRAGMAs to a connection
///
/// foreign_keys and busy_timeout are per-connection settings.
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Open a connection with the shared configuration
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Read schema_version (None if the table does not exist)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// Create all tables and indexes if missing and record the schema version
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL
);

-- ===== recipes =====
CREATE TABLE IF NOT EXISTS recipe (
    id                          TEXT PRIMARY KEY,
    recipe_code                 TEXT NOT NULL UNIQUE,
    name                        TEXT NOT NULL,
    binder_type                 TEXT NOT NULL,
    compressive_strength_class  TEXT NOT NULL,
    flexural_strength_class     TEXT NOT NULL,
    wear_resistance_class       TEXT,
    fire_class                  TEXT NOT NULL,
    avcp_system                 TEXT NOT NULL,
    manufacturer_name           TEXT NOT NULL,
    manufacturer_address        TEXT NOT NULL,
    notified_body               TEXT,
    version                     INTEGER NOT NULL DEFAULT 1,
    status                      TEXT NOT NULL DEFAULT 'draft',
    previous_version_id         TEXT REFERENCES recipe(id),
    created_by                  TEXT NOT NULL,
    created_at                  TEXT NOT NULL,
    updated_at                  TEXT NOT NULL,
    locked_at                   TEXT
);

-- ===== batches =====
CREATE TABLE IF NOT EXISTS batch (
    id               TEXT PRIMARY KEY,
    batch_number     TEXT NOT NULL UNIQUE,
    recipe_id        TEXT NOT NULL REFERENCES recipe(id),
    production_date  TEXT NOT NULL,
    quantity_t       REAL NOT NULL,
    qc_data_json     TEXT NOT NULL DEFAULT '{}',
    status           TEXT NOT NULL DEFAULT 'produced',
    blocked_reason   TEXT,
    released_by      TEXT,
    released_at      TEXT,
    created_by       TEXT NOT NULL,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_batch_recipe_date ON batch(recipe_id, production_date);
CREATE INDEX IF NOT EXISTS idx_batch_status ON batch(status);

-- ===== test reports =====
CREATE TABLE IF NOT EXISTS test_report (
    id              TEXT PRIMARY KEY,
    recipe_id       TEXT NOT NULL REFERENCES recipe(id),
    report_number   TEXT NOT NULL UNIQUE,
    report_type     TEXT NOT NULL,
    test_date       TEXT NOT NULL,
    valid_until     TEXT,
    laboratory      TEXT NOT NULL,
    results_json    TEXT NOT NULL DEFAULT '{}',
    status          TEXT NOT NULL DEFAULT 'valid',
    revoked_reason  TEXT,
    created_by      TEXT NOT NULL,
    created_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_test_report_recipe ON test_report(recipe_id);
CREATE INDEX IF NOT EXISTS idx_test_report_valid_until ON test_report(status, valid_until);

-- ===== deviations / CAPA =====
CREATE TABLE IF NOT EXISTS deviation (
    id                TEXT PRIMARY KEY,
    deviation_number  TEXT NOT NULL UNIQUE,
    title             TEXT NOT NULL,
    description       TEXT NOT NULL,
    deviation_type    TEXT NOT NULL,
    severity          TEXT NOT NULL,
    source            TEXT NOT NULL,
    status            TEXT NOT NULL DEFAULT 'open',
    recipe_id         TEXT REFERENCES recipe(id),
    batch_id          TEXT REFERENCES batch(id),
    root_cause_json   TEXT,
    created_by        TEXT NOT NULL,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    closed_at         TEXT
);
CREATE INDEX IF NOT EXISTS idx_deviation_batch ON deviation(batch_id);
CREATE INDEX IF NOT EXISTS idx_deviation_status ON deviation(status);

CREATE TABLE IF NOT EXISTS corrective_action (
    id                  TEXT PRIMARY KEY,
    deviation_id        TEXT NOT NULL REFERENCES deviation(id),
    kind                TEXT NOT NULL,
    description         TEXT NOT NULL,
    responsible_person  TEXT NOT NULL,
    planned_start       TEXT NOT NULL,
    planned_due         TEXT NOT NULL,
    actual_start        TEXT,
    actual_completion   TEXT,
    status              TEXT NOT NULL DEFAULT 'planned',
    completion_note     TEXT,
    created_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_corrective_action_deviation ON corrective_action(deviation_id);

CREATE TABLE IF NOT EXISTS effectiveness_check (
    id                TEXT PRIMARY KEY,
    deviation_id      TEXT NOT NULL REFERENCES deviation(id),
    success_criteria  TEXT NOT NULL,
    planned_date      TEXT NOT NULL,
    performed_on      TEXT,
    performed_by      TEXT,
    result            TEXT NOT NULL DEFAULT 'pending',
    notes             TEXT,
    created_at        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_effectiveness_check_deviation ON effectiveness_check(deviation_id);

-- ===== declarations of performance =====
CREATE TABLE IF NOT EXISTS dop (
    id                    TEXT PRIMARY KEY,
    dop_number            TEXT NOT NULL UNIQUE,
    recipe_id             TEXT NOT NULL REFERENCES recipe(id),
    recipe_version        INTEGER NOT NULL,
    batch_id              TEXT REFERENCES batch(id),
    title                 TEXT NOT NULL,
    product_designation   TEXT NOT NULL,
    intended_use          TEXT NOT NULL,
    manufacturer          TEXT NOT NULL,
    avcp_system           TEXT NOT NULL,
    notified_body         TEXT,
    characteristics_json  TEXT NOT NULL,
    test_reports_json     TEXT NOT NULL,
    language              TEXT NOT NULL,
    issued_on             TEXT NOT NULL,
    status                TEXT NOT NULL DEFAULT 'issued',
    revoked_reason        TEXT,
    created_by            TEXT NOT NULL,
    created_at            TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_dop_recipe ON dop(recipe_id);

-- ===== calibration =====
CREATE TABLE IF NOT EXISTS calibration_record (
    id               TEXT PRIMARY KEY,
    equipment_id     TEXT NOT NULL,
    equipment_name   TEXT NOT NULL,
    calibrated_on    TEXT NOT NULL,
    interval_months  INTEGER NOT NULL,
    next_due         TEXT NOT NULL,
    performed_by     TEXT NOT NULL,
    certificate_ref  TEXT,
    passed           INTEGER NOT NULL,
    created_at       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_calibration_equipment ON calibration_record(equipment_id, calibrated_on);

-- ===== number sequences =====
CREATE TABLE IF NOT EXISTS number_sequence (
    scope       TEXT NOT NULL,
    period      TEXT NOT NULL,
    last_value  INTEGER NOT NULL,
    PRIMARY KEY (scope, period)
);

-- ===== audit =====
CREATE TABLE IF NOT EXISTS action_log (
    action_id     TEXT PRIMARY KEY,
    entity_type   TEXT NOT NULL,
    entity_id     TEXT NOT NULL,
    action_type   TEXT NOT NULL,
    action_ts     TEXT NOT NULL,
    actor         TEXT NOT NULL,
    payload_json  TEXT,
    detail        TEXT
);
CREATE INDEX IF NOT EXISTS idx_action_log_entity ON action_log(entity_type, entity_id);
CREATE INDEX IF NOT EXISTS idx_action_log_ts ON action_log(action_ts);

-- ===== configuration =====
CREATE TABLE IF NOT EXISTS config_scope (
    scope_id    TEXT PRIMARY KEY,
    scope_type  TEXT NOT NULL,
    scope_key   TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key) VALUES ('global', 'GLOBAL', 'global');

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id    TEXT NOT NULL REFERENCES config_scope(scope_id),
    key         TEXT NOT NULL,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));

        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}
