//! [`RunLogger`] backed by a SQLite file.

use crate::error::{Result, SqliteLoggerError};
use crate::schema;
use aqualisys_core::{LoggedRun, Report, RuleResultRecord, RunLogger, RunRecord, Severity};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

const RUN_COLUMNS: &str = "run_id, dataset, started_at, ended_at, passed, fail_fast_triggered, \
                           total_rules, failed_rules, warn_failures";

/// Persists run headers and rule results to SQLite.
///
/// Writes for one run happen in a single transaction: the header is upserted,
/// the run's previous rule rows are deleted and the new rows inserted. A retry
/// of the same run id therefore replaces the earlier record. The connection is
/// guarded by a mutex so concurrent callers in one process are serialized;
/// other processes are handled by SQLite's busy timeout plus a bounded retry.
#[derive(Debug)]
pub struct SqliteRunLogger {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    retries: u32,
    retry_delay: Duration,
}

impl SqliteRunLogger {
    /// Opens (or creates) the database at `path`, creating its parent
    /// directory when missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SqliteLoggerError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        info!("Opening run log at {}", path.display());
        let conn = Connection::open(path)?;
        // WAL lets readers proceed while a run is being written.
        let mode: String = conn.query_row("pragma journal_mode = wal", [], |row| row.get(0))?;
        debug!("SQLite journal mode: {}", mode);

        Self::initialise(conn, Some(path.to_path_buf()))
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::initialise(Connection::open_in_memory()?, None)
    }

    fn initialise(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Sets how many times a busy write is retried and the delay between
    /// attempts.
    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = delay;
        self
    }

    /// Database path, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes a report, replacing any earlier record with the same run id.
    pub fn write_report(&self, report: &Report) -> Result<LoggedRun> {
        let header = RunRecord::from_report(report);
        let rows = RuleResultRecord::from_report(report);

        let mut attempt = 0;
        loop {
            match self.write_once(&header, &rows) {
                Ok(()) => break,
                Err(err) if err.is_busy() && attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        "Run log busy while writing {}, retry {}/{}",
                        header.run_id, attempt, self.retries
                    );
                    thread::sleep(self.retry_delay);
                }
                Err(err) => return Err(err),
            }
        }

        debug!("Logged run {} with {} rule rows", header.run_id, rows.len());
        Ok(LoggedRun {
            run_id: header.run_id,
            rule_rows: rows.len(),
        })
    }

    fn write_once(&self, header: &RunRecord, rows: &[RuleResultRecord]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            &format!(
                "insert into runs ({RUN_COLUMNS})
                 values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 on conflict(run_id) do update set
                    dataset = excluded.dataset,
                    started_at = excluded.started_at,
                    ended_at = excluded.ended_at,
                    passed = excluded.passed,
                    fail_fast_triggered = excluded.fail_fast_triggered,
                    total_rules = excluded.total_rules,
                    failed_rules = excluded.failed_rules,
                    warn_failures = excluded.warn_failures"
            ),
            params![
                header.run_id,
                header.dataset,
                format_timestamp(&header.started_at),
                format_timestamp(&header.ended_at),
                header.passed,
                header.fail_fast_triggered,
                header.total_rules as i64,
                header.failed_rules as i64,
                header.warn_failures as i64,
            ],
        )?;

        tx.execute(
            "delete from rule_results where run_id = ?1",
            params![header.run_id],
        )?;

        {
            let mut stmt = tx.prepare(
                "insert into rule_results (
                    run_id, rule_id, rule_type, \"column\", severity, passed,
                    metric_value, metric_detail, description, position,
                    duration_ms, recorded_at
                 ) values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.run_id,
                    row.rule_id,
                    row.rule_type,
                    row.column,
                    row.severity.as_str(),
                    row.passed,
                    row.metric_value,
                    row.metric_detail,
                    row.description,
                    row.position as i64,
                    row.duration_ms as i64,
                    format_timestamp(&row.recorded_at),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Loads a run header.
    pub fn load_run(&self, run_id: &str) -> Result<Option<RunRecord>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!("select {RUN_COLUMNS} from runs where run_id = ?1"),
                params![run_id],
                RawRun::from_row,
            )
            .optional()?;
        raw.map(RawRun::decode).transpose()
    }

    /// Loads the rule rows of a run in report order.
    pub fn load_rule_results(&self, run_id: &str) -> Result<Vec<RuleResultRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "select run_id, rule_id, rule_type, \"column\", severity, passed,
                    metric_value, metric_detail, description, position,
                    duration_ms, recorded_at
             from rule_results
             where run_id = ?1
             order by position",
        )?;
        let raw = stmt
            .query_map(params![run_id], RawRuleResult::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter().map(RawRuleResult::decode).collect()
    }

    /// Lists the most recent runs, newest first, optionally for one dataset.
    pub fn recent_runs(&self, dataset: Option<&str>, limit: usize) -> Result<Vec<RunRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "select {RUN_COLUMNS} from runs
             where ?1 is null or dataset = ?1
             order by started_at desc, run_id
             limit ?2"
        ))?;
        let raw = stmt
            .query_map(params![dataset, limit as i64], RawRun::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter().map(RawRun::decode).collect()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SqliteLoggerError::Poisoned)
    }
}

impl RunLogger for SqliteRunLogger {
    fn record_run(&self, report: &Report) -> aqualisys_core::Result<LoggedRun> {
        Ok(self.write_report(report)?)
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| SqliteLoggerError::invalid_value(column, format!("{value}: {e}")))
}

fn to_count(column: &str, value: i64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| SqliteLoggerError::invalid_value(column, format!("negative count {value}")))
}

/// Row as stored, before timestamps and counts are decoded.
struct RawRun {
    run_id: String,
    dataset: String,
    started_at: String,
    ended_at: String,
    passed: bool,
    fail_fast_triggered: bool,
    total_rules: i64,
    failed_rules: i64,
    warn_failures: i64,
}

impl RawRun {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            run_id: row.get(0)?,
            dataset: row.get(1)?,
            started_at: row.get(2)?,
            ended_at: row.get(3)?,
            passed: row.get(4)?,
            fail_fast_triggered: row.get(5)?,
            total_rules: row.get(6)?,
            failed_rules: row.get(7)?,
            warn_failures: row.get(8)?,
        })
    }

    fn decode(self) -> Result<RunRecord> {
        Ok(RunRecord {
            started_at: parse_timestamp("started_at", &self.started_at)?,
            ended_at: parse_timestamp("ended_at", &self.ended_at)?,
            total_rules: to_count("total_rules", self.total_rules)?,
            failed_rules: to_count("failed_rules", self.failed_rules)?,
            warn_failures: to_count("warn_failures", self.warn_failures)?,
            run_id: self.run_id,
            dataset: self.dataset,
            passed: self.passed,
            fail_fast_triggered: self.fail_fast_triggered,
        })
    }
}

struct RawRuleResult {
    run_id: String,
    rule_id: String,
    rule_type: String,
    column: Option<String>,
    severity: String,
    passed: bool,
    metric_value: Option<f64>,
    metric_detail: Option<String>,
    description: Option<String>,
    position: i64,
    duration_ms: i64,
    recorded_at: Option<String>,
}

impl RawRuleResult {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            run_id: row.get(0)?,
            rule_id: row.get(1)?,
            rule_type: row.get(2)?,
            column: row.get(3)?,
            severity: row.get(4)?,
            passed: row.get(5)?,
            metric_value: row.get(6)?,
            metric_detail: row.get(7)?,
            description: row.get(8)?,
            position: row.get(9)?,
            duration_ms: row.get(10)?,
            recorded_at: row.get(11)?,
        })
    }

    fn decode(self) -> Result<RuleResultRecord> {
        let severity: Severity = self
            .severity
            .parse()
            .map_err(|e: aqualisys_core::QualityError| {
                SqliteLoggerError::invalid_value("severity", e.to_string())
            })?;
        // Rows migrated from older databases have no timestamp.
        let recorded_at = match self.recorded_at {
            Some(value) => parse_timestamp("recorded_at", &value)?,
            None => DateTime::<Utc>::UNIX_EPOCH,
        };
        let duration_ms = u64::try_from(self.duration_ms).map_err(|_| {
            SqliteLoggerError::invalid_value("duration_ms", format!("{}", self.duration_ms))
        })?;

        Ok(RuleResultRecord {
            run_id: self.run_id,
            rule_id: self.rule_id,
            rule_type: self.rule_type,
            column: self.column,
            severity,
            passed: self.passed,
            metric_value: self.metric_value.unwrap_or(f64::NAN),
            metric_detail: self.metric_detail.unwrap_or_else(|| "{}".to_string()),
            description: self.description,
            position: to_count("position", self.position)?,
            duration_ms,
            recorded_at,
        })
    }
}
