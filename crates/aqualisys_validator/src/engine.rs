//! Main run orchestration.
//!
//! This module provides the [`DataQualityChecker`] that resolves the rule set
//! of a run, evaluates the rules in order, applies fail-fast, builds the
//! [`Report`] and hands it to the configured [`RunLogger`].

use crate::selection::{PlannedRule, RunPlan, resolve_plan};
use crate::{BuildContext, RuleBundle, RuleRegistry};
use aqualisys_core::{
    DataSet, LoggedRun, QualityError, Report, Result, Rule, RuleOutcome, RuleSpec, RunLogger,
    RunOptions, Severity,
};
use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What happened to the report after the run.
#[derive(Debug)]
pub enum LoggingStatus {
    /// The logger stored the run
    Recorded(LoggedRun),
    /// No logger is configured
    Disabled,
    /// The logger failed; the report is still valid
    Failed(QualityError),
}

impl LoggingStatus {
    /// Returns true if the run was stored.
    pub fn is_recorded(&self) -> bool {
        matches!(self, LoggingStatus::Recorded(_))
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            LoggingStatus::Recorded(_) => "recorded",
            LoggingStatus::Disabled => "disabled",
            LoggingStatus::Failed(_) => "failed",
        }
    }
}

/// Result of one checker run: the report plus its logging status.
#[derive(Debug)]
pub struct RunResult {
    /// The run report
    pub report: Report,
    /// Whether the report was persisted
    pub logging: LoggingStatus,
}

impl RunResult {
    /// Overall result of the run.
    pub fn passed(&self) -> bool {
        self.report.passed()
    }

    /// Consumes the result, keeping only the report.
    pub fn into_report(self) -> Report {
        self.report
    }
}

/// Orchestrates data-quality runs.
///
/// A checker holds an ordered rule set and an optional logger. It keeps no
/// state between runs, so one checker can serve any number of runs.
///
/// # Example
///
/// ```rust
/// use aqualisys_core::{DataSet, Rule, RunOptions};
/// use aqualisys_validator::{DataQualityChecker, NotNullRule, UniqueRule};
/// use std::sync::Arc;
///
/// let checker = DataQualityChecker::new(vec![
///     Arc::new(NotNullRule::new("order_id").unwrap()) as Arc<dyn Rule>,
///     Arc::new(UniqueRule::new("order_id").unwrap()),
/// ])
/// .unwrap();
///
/// let dataset = DataSet::from_columns([("order_id", vec![1_i64, 2, 2])]);
/// let result = checker.run(&dataset, "orders", &RunOptions::new()).unwrap();
///
/// assert!(!result.passed());
/// assert_eq!(result.report.outcomes.len(), 2);
/// ```
pub struct DataQualityChecker {
    rules: Vec<Arc<dyn Rule>>,
    logger: Option<Arc<dyn RunLogger>>,
}

impl DataQualityChecker {
    /// Creates a checker for an ordered rule set.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateRuleId` if two rules share an id.
    pub fn new(rules: Vec<Arc<dyn Rule>>) -> Result<Self> {
        ensure_unique_ids(&rules)?;

        Ok(Self {
            rules,
            logger: None,
        })
    }

    /// Appends rules after the existing ones.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateRuleId` if an added rule reuses an id already present.
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = Arc<dyn Rule>>) -> Result<Self> {
        self.rules.extend(rules);
        ensure_unique_ids(&self.rules)?;
        Ok(self)
    }

    /// Appends the rules of `bundle` after the existing ones.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateRuleId` if a bundled rule reuses an id already present.
    pub fn with_bundle(self, bundle: RuleBundle) -> Result<Self> {
        debug!(
            bundle = bundle.name(),
            rules = bundle.rules().len(),
            "Adding rule bundle"
        );
        self.with_rules(bundle.into_rules())
    }

    /// Builds the rules of `specs` through `registry` and creates a checker.
    pub fn from_specs(
        registry: &RuleRegistry,
        specs: &[RuleSpec],
        context: &BuildContext,
    ) -> Result<Self> {
        Self::new(registry.build_rules(specs, context)?)
    }

    /// Sets the logger that receives every report.
    pub fn with_logger(mut self, logger: Arc<dyn RunLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The configured rules, in order.
    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    /// Resolves the effective rule set for `options` without evaluating anything.
    pub fn plan(&self, options: &RunOptions) -> Result<RunPlan> {
        resolve_plan(&self.rules, options)
    }

    /// Runs the selected rules against `dataset`.
    ///
    /// # Arguments
    ///
    /// * `dataset` - The data to check; it is only read
    /// * `dataset_name` - Name recorded in the report
    /// * `options` - Tag selectors, severity overrides, fail-fast and run id
    ///
    /// # Errors
    ///
    /// Only configuration errors are returned, before any rule runs. Rule
    /// evaluation failures become failing outcomes and logger failures are
    /// reported through [`RunResult::logging`].
    pub fn run(
        &self,
        dataset: &DataSet,
        dataset_name: &str,
        options: &RunOptions,
    ) -> Result<RunResult> {
        let plan = self.plan(options)?;
        let run_id = options
            .run_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let started_at = Utc::now();

        info!(
            "Starting run {} on '{}': {} rules selected ({} rows)",
            run_id,
            dataset_name,
            plan.len(),
            dataset.len()
        );

        let mut outcomes = Vec::with_capacity(plan.len());
        let mut fail_fast_triggered = false;
        let mut skipped_rules = Vec::new();

        let mut planned_rules = plan.rules.iter();
        while let Some(planned) = planned_rules.next() {
            let outcome = evaluate(planned, dataset);
            let stop = options.fail_fast && outcome.is_blocking_failure();
            outcomes.push(outcome);

            if stop {
                fail_fast_triggered = true;
                skipped_rules = planned_rules.by_ref().map(PlannedRule::id).collect();
                warn!(
                    "Fail-fast triggered by {}; skipping {} rules",
                    planned.id(),
                    skipped_rules.len()
                );
                break;
            }
        }

        let report = Report::new(
            run_id,
            dataset_name,
            started_at,
            Utc::now(),
            outcomes,
            fail_fast_triggered,
            skipped_rules,
        );

        info!(
            "Run {} finished: passed={} failed={} warnings={}",
            report.run_id,
            report.passed(),
            report.error_failures().count(),
            report.warn_failures().count()
        );

        let logging = self.log(&report);
        Ok(RunResult { report, logging })
    }

    fn log(&self, report: &Report) -> LoggingStatus {
        let Some(logger) = &self.logger else {
            return LoggingStatus::Disabled;
        };

        match logger.record_run(report) {
            Ok(logged) => {
                debug!("Recorded run {} ({} rule rows)", logged.run_id, logged.rule_rows);
                LoggingStatus::Recorded(logged)
            }
            Err(err) => {
                warn!("Failed to record run {}: {}", report.run_id, err);
                LoggingStatus::Failed(err)
            }
        }
    }
}

impl std::fmt::Debug for DataQualityChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataQualityChecker")
            .field("rules", &self.rules)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// Evaluates one planned rule into an outcome.
fn evaluate(planned: &PlannedRule, dataset: &DataSet) -> RuleOutcome {
    let meta = planned.rule.meta();
    let evaluated_at = Utc::now();
    let start = Instant::now();
    let result = planned.rule.evaluate(dataset);
    let duration_ms = start.elapsed().as_millis() as u64;

    let mut outcome = RuleOutcome {
        rule_id: planned.id(),
        rule_type: meta.rule_type().to_string(),
        columns: meta.columns().to_vec(),
        severity: planned.severity,
        passed: false,
        metric_value: 0.0,
        metric_detail: json!({}),
        message: String::new(),
        description: meta.description(),
        errored: false,
        duration_ms,
        evaluated_at,
    };

    match result {
        Ok(evaluation) => {
            outcome.passed = evaluation.passed;
            outcome.metric_value = evaluation.metric_value;
            outcome.metric_detail = evaluation.detail;
            outcome.message = evaluation.message;
        }
        Err(err) => {
            warn!("Rule {} could not be evaluated: {}", outcome.rule_id, err);
            outcome.severity = Severity::Error;
            outcome.errored = true;
            outcome.metric_detail = json!({ "error": err.to_string() });
            outcome.message = err.to_string();
        }
    }

    debug!(
        "Rule {} [{}] passed={} metric={} ({} ms)",
        outcome.rule_id, outcome.severity, outcome.passed, outcome.metric_value, duration_ms
    );
    outcome
}

fn ensure_unique_ids(rules: &[Arc<dyn Rule>]) -> Result<()> {
    let mut seen = HashSet::new();
    for rule in rules {
        let id = rule.id();
        if !seen.insert(id.clone()) {
            return Err(QualityError::DuplicateRuleId(id));
        }
    }
    Ok(())
}
