//! Run-time selectors for checker runs.

use crate::Severity;
use std::collections::{BTreeMap, BTreeSet};

/// Options for one checker run.
///
/// Selects rules by tag, overrides severities for this run only and controls
/// fail-fast. Tags are compared lower-cased.
///
/// # Example
///
/// ```rust
/// use aqualisys_core::{RunOptions, Severity};
///
/// let options = RunOptions::new()
///     .with_include_tags(["Integrity"])
///     .with_severity_override("UniqueRule::order_id", Severity::Warn)
///     .with_fail_fast(true);
///
/// assert!(options.include_tags.contains("integrity"));
/// assert!(options.fail_fast);
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunOptions {
    /// Keep only rules carrying at least one of these tags (when non-empty)
    pub include_tags: BTreeSet<String>,

    /// Drop rules carrying any of these tags
    pub exclude_tags: BTreeSet<String>,

    /// Per-run severity, keyed by rule id
    pub severity_overrides: BTreeMap<String, Severity>,

    /// Stop after the first failing error-severity rule
    pub fail_fast: bool,

    /// Caller-supplied run id; a UUID is generated when absent
    pub run_id: Option<String>,
}

impl RunOptions {
    /// Creates options that select every rule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds include tags.
    pub fn with_include_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.include_tags.extend(normalize_tags(tags));
        self
    }

    /// Adds exclude tags.
    pub fn with_exclude_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude_tags.extend(normalize_tags(tags));
        self
    }

    /// Overrides the severity of one rule for this run.
    pub fn with_severity_override(mut self, rule_id: impl Into<String>, severity: Severity) -> Self {
        self.severity_overrides.insert(rule_id.into(), severity);
        self
    }

    /// Sets fail-fast mode.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Uses a fixed run id instead of a generated one.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Returns true if a rule with these tags passes the tag selectors.
    pub fn selects(&self, tags: &BTreeSet<String>) -> bool {
        if !self.exclude_tags.is_disjoint(tags) {
            return false;
        }
        self.include_tags.is_empty() || !self.include_tags.is_disjoint(tags)
    }
}

fn normalize_tags<I, S>(tags: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter().map(|t| t.as_ref().trim().to_lowercase())
}
