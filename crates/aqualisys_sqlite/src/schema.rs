//! Table definitions and additive migrations.

use crate::Result;
use rusqlite::Connection;
use tracing::info;

/// Base tables. `column` is quoted because it is an SQL keyword.
const CREATE_TABLES: &str = "
    create table if not exists runs (
        run_id text primary key,
        dataset text not null,
        started_at text not null,
        ended_at text not null,
        passed integer not null,
        fail_fast_triggered integer not null
    );
    create table if not exists rule_results (
        run_id text not null,
        rule_id text not null,
        rule_type text not null,
        \"column\" text,
        severity text not null,
        passed integer not null,
        metric_value real,
        metric_detail text,
        description text,
        primary key (run_id, rule_id)
    );
    create index if not exists idx_runs_dataset_started
        on runs (dataset, started_at);
";

/// Columns added after the base tables, as `(table, column, type)`.
const ADDITIVE_COLUMNS: &[(&str, &str, &str)] = &[
    ("runs", "total_rules", "integer not null default 0"),
    ("runs", "failed_rules", "integer not null default 0"),
    ("runs", "warn_failures", "integer not null default 0"),
    ("rule_results", "position", "integer not null default 0"),
    ("rule_results", "duration_ms", "integer not null default 0"),
    ("rule_results", "recorded_at", "text"),
];

/// Creates missing tables and adds missing columns.
///
/// Databases written by older versions keep their rows; new columns take
/// their defaults.
pub(crate) fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)?;

    for (table, column, definition) in ADDITIVE_COLUMNS {
        if !has_column(conn, table, column)? {
            info!("Adding column {}.{}", table, column);
            conn.execute_batch(&format!(
                "alter table {} add column {} {}",
                table, column, definition
            ))?;
        }
    }

    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("pragma table_info({})", table))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();

        assert!(has_column(&conn, "runs", "warn_failures").unwrap());
        assert!(has_column(&conn, "rule_results", "column").unwrap());
    }

    #[test]
    fn test_migrate_adds_columns_to_old_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "create table runs (
                run_id text primary key,
                dataset text not null,
                started_at text not null,
                ended_at text not null,
                passed integer not null,
                fail_fast_triggered integer not null
            );
            insert into runs values ('old', 'orders', 'a', 'b', 1, 0);",
        )
        .unwrap();

        migrate(&conn).unwrap();

        let total: i64 = conn
            .query_row("select total_rules from runs where run_id = 'old'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(total, 0);
    }
}
