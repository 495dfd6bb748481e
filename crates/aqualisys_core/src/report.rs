//! Run results: per-rule outcomes and the run report.

use crate::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Outcome of one rule in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    /// Rule id (instance name or `<RuleType>::<target>`)
    pub rule_id: String,

    /// Rule type name
    pub rule_type: String,

    /// Target columns, empty for expression rules
    pub columns: Vec<String>,

    /// Severity in effect for this run
    pub severity: Severity,

    /// Whether the rule held
    pub passed: bool,

    /// Primary metric, usually a violation count
    pub metric_value: f64,

    /// Structured metric detail
    pub metric_detail: JsonValue,

    /// Short human-readable summary
    pub message: String,

    /// Rule description
    pub description: String,

    /// True when the rule could not be evaluated at all
    pub errored: bool,

    /// Evaluation time in milliseconds
    pub duration_ms: u64,

    /// When the outcome was produced
    pub evaluated_at: DateTime<Utc>,
}

impl RuleOutcome {
    /// Target columns joined for storage, or `None` when there are none.
    pub fn column_label(&self) -> Option<String> {
        if self.columns.is_empty() {
            None
        } else {
            Some(self.columns.join(","))
        }
    }

    /// Returns true for a failing outcome with error severity.
    pub fn is_blocking_failure(&self) -> bool {
        !self.passed && self.severity == Severity::Error
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every selected rule was evaluated
    Completed,
    /// Fail-fast stopped the run early
    Aborted,
}

/// Structured outcome of one checker run.
///
/// # Example
///
/// ```rust
/// use aqualisys_core::Report;
/// use chrono::Utc;
///
/// let now = Utc::now();
/// let report = Report::new("run-1", "orders", now, now, Vec::new(), false, Vec::new());
/// assert!(report.passed());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Unique run identifier
    pub run_id: String,

    /// Name of the validated dataset
    pub dataset_name: String,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run ended
    pub ended_at: DateTime<Utc>,

    /// Outcomes in resolved rule order
    pub outcomes: Vec<RuleOutcome>,

    /// Whether fail-fast truncated the run
    pub fail_fast_triggered: bool,

    /// Ids of rules not evaluated because fail-fast stopped the run
    pub skipped_rules: Vec<String>,
}

impl Report {
    /// Creates a report.
    pub fn new(
        run_id: impl Into<String>,
        dataset_name: impl Into<String>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        outcomes: Vec<RuleOutcome>,
        fail_fast_triggered: bool,
        skipped_rules: Vec<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            dataset_name: dataset_name.into(),
            started_at,
            ended_at,
            outcomes,
            fail_fast_triggered,
            skipped_rules,
        }
    }

    /// False iff some error-severity outcome failed.
    pub fn passed(&self) -> bool {
        !self.outcomes.iter().any(RuleOutcome::is_blocking_failure)
    }

    /// Terminal state of the run.
    pub fn status(&self) -> RunStatus {
        if self.fail_fast_triggered {
            RunStatus::Aborted
        } else {
            RunStatus::Completed
        }
    }

    /// All failing outcomes, regardless of severity.
    pub fn failed_outcomes(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    /// Failing outcomes with error severity.
    pub fn error_failures(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|o| o.is_blocking_failure())
    }

    /// Failing outcomes with warn severity.
    pub fn warn_failures(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes
            .iter()
            .filter(|o| !o.passed && o.severity == Severity::Warn)
    }

    /// Looks up an outcome by rule id.
    pub fn outcome(&self, rule_id: &str) -> Option<&RuleOutcome> {
        self.outcomes.iter().find(|o| o.rule_id == rule_id)
    }

    /// Run duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }
}
