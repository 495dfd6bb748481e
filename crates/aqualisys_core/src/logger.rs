//! The run logger contract.
//!
//! A [`RunLogger`] persists one [`Report`] as a run header plus one row per rule
//! outcome. The checker only depends on this trait; the SQLite backend lives in
//! its own crate and [`MemoryRunLogger`] keeps records in memory.

use crate::{QualityError, Report, Result, RuleOutcome, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Core trait for persisting run records.
///
/// Implementations are called once per checker run. Recording the same run id
/// again must replace the earlier record rather than duplicate its rows, and a
/// backend must serialize its own writes.
pub trait RunLogger: Send + Sync {
    /// Persists a report.
    fn record_run(&self, report: &Report) -> Result<LoggedRun>;
}

/// Acknowledgement returned by a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedRun {
    /// Run id that was written
    pub run_id: String,
    /// Number of rule rows written
    pub rule_rows: usize,
}

/// Run header row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run id
    pub run_id: String,
    /// Dataset name
    pub dataset: String,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
    /// End timestamp
    pub ended_at: DateTime<Utc>,
    /// Overall result
    pub passed: bool,
    /// Whether fail-fast truncated the run
    pub fail_fast_triggered: bool,
    /// Number of evaluated rules
    pub total_rules: usize,
    /// Number of failing rules, any severity
    pub failed_rules: usize,
    /// Number of failing warn-severity rules
    pub warn_failures: usize,
}

impl RunRecord {
    /// Projects the header of a report.
    pub fn from_report(report: &Report) -> Self {
        Self {
            run_id: report.run_id.clone(),
            dataset: report.dataset_name.clone(),
            started_at: report.started_at,
            ended_at: report.ended_at,
            passed: report.passed(),
            fail_fast_triggered: report.fail_fast_triggered,
            total_rules: report.outcomes.len(),
            failed_rules: report.failed_outcomes().count(),
            warn_failures: report.warn_failures().count(),
        }
    }
}

/// Rule result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResultRecord {
    /// Run id
    pub run_id: String,
    /// Rule id
    pub rule_id: String,
    /// Rule type name
    pub rule_type: String,
    /// Target column(s), comma separated
    pub column: Option<String>,
    /// Effective severity
    pub severity: Severity,
    /// Whether the rule held
    pub passed: bool,
    /// Primary metric
    pub metric_value: f64,
    /// Metric detail as JSON text
    pub metric_detail: String,
    /// Rule description
    pub description: Option<String>,
    /// Position in the report's outcome sequence
    pub position: usize,
    /// Evaluation time in milliseconds
    pub duration_ms: u64,
    /// When the outcome was produced
    pub recorded_at: DateTime<Utc>,
}

impl RuleResultRecord {
    /// Projects one outcome of a report.
    pub fn from_outcome(run_id: &str, position: usize, outcome: &RuleOutcome) -> Self {
        Self {
            run_id: run_id.to_string(),
            rule_id: outcome.rule_id.clone(),
            rule_type: outcome.rule_type.clone(),
            column: outcome.column_label(),
            severity: outcome.severity,
            passed: outcome.passed,
            metric_value: outcome.metric_value,
            metric_detail: outcome.metric_detail.to_string(),
            description: Some(outcome.description.clone()).filter(|d| !d.is_empty()),
            position,
            duration_ms: outcome.duration_ms,
            recorded_at: outcome.evaluated_at,
        }
    }

    /// Projects every outcome of a report, in order.
    pub fn from_report(report: &Report) -> Vec<Self> {
        report
            .outcomes
            .iter()
            .enumerate()
            .map(|(position, outcome)| Self::from_outcome(&report.run_id, position, outcome))
            .collect()
    }
}

/// Run logger that keeps records in memory, keyed by run id.
#[derive(Debug, Default)]
pub struct MemoryRunLogger {
    runs: Mutex<BTreeMap<String, (RunRecord, Vec<RuleResultRecord>)>>,
}

impl MemoryRunLogger {
    /// Creates an empty logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored header and rows of a run.
    pub fn get(&self, run_id: &str) -> Option<(RunRecord, Vec<RuleResultRecord>)> {
        self.runs.lock().ok()?.get(run_id).cloned()
    }

    /// Number of stored runs.
    pub fn len(&self) -> usize {
        self.runs.lock().map(|runs| runs.len()).unwrap_or(0)
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RunLogger for MemoryRunLogger {
    fn record_run(&self, report: &Report) -> Result<LoggedRun> {
        let header = RunRecord::from_report(report);
        let rows = RuleResultRecord::from_report(report);
        let rule_rows = rows.len();

        let mut runs = self
            .runs
            .lock()
            .map_err(|_| QualityError::logging("memory logger lock poisoned"))?;
        runs.insert(report.run_id.clone(), (header, rows));

        Ok(LoggedRun {
            run_id: report.run_id.clone(),
            rule_rows,
        })
    }
}
