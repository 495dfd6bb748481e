//! Resolving which rules run, and at which severity.

use aqualisys_core::{QualityError, Result, Rule, RunOptions, Severity};
use std::sync::Arc;

/// A rule selected for a run, with the severity in effect for that run.
#[derive(Debug, Clone)]
pub struct PlannedRule {
    /// The rule
    pub rule: Arc<dyn Rule>,
    /// Effective severity
    pub severity: Severity,
    /// True when a run-time override changed the configured severity
    pub overridden: bool,
}

impl PlannedRule {
    /// Rule id.
    pub fn id(&self) -> String {
        self.rule.id()
    }
}

/// The effective rule set of one run, in configured order.
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    /// Selected rules
    pub rules: Vec<PlannedRule>,
    /// Ids of rules dropped by the tag selectors
    pub deselected: Vec<String>,
}

impl RunPlan {
    /// Number of selected rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rule was selected.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Applies tag selectors and severity overrides to `rules`.
///
/// Configured order is preserved. An override key matches a rule by instance
/// name or by `<RuleType>::<target>`, and must match exactly one selected rule.
///
/// # Errors
///
/// Returns `UnknownOverride` for a key matching no selected rule and
/// `AmbiguousOverride` for a key matching several.
pub fn resolve_plan(rules: &[Arc<dyn Rule>], options: &RunOptions) -> Result<RunPlan> {
    let mut plan = RunPlan::default();

    for rule in rules {
        if options.selects(rule.meta().tags()) {
            plan.rules.push(PlannedRule {
                rule: Arc::clone(rule),
                severity: rule.meta().severity(),
                overridden: false,
            });
        } else {
            plan.deselected.push(rule.id());
        }
    }

    for (key, severity) in &options.severity_overrides {
        let mut matches = plan
            .rules
            .iter_mut()
            .filter(|p| p.rule.meta().matches_key(key))
            .collect::<Vec<_>>();
        match matches.len() {
            0 => return Err(QualityError::UnknownOverride { key: key.clone() }),
            1 => {
                let planned = &mut matches[0];
                planned.overridden = planned.severity != *severity;
                planned.severity = *severity;
            }
            count => {
                return Err(QualityError::AmbiguousOverride {
                    key: key.clone(),
                    count,
                });
            }
        }
    }

    Ok(plan)
}
