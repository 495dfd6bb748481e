//! The rule contract.
//!
//! A rule is one declarative data-quality check. Built-in rules live in the
//! validator crate; anything implementing [`Rule`] can be handed to the checker
//! alongside them.

use crate::{DataSet, EvaluationError, QualityError};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Whether a failing rule flips the overall run result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Severity {
    /// Failure fails the run
    #[default]
    Error,
    /// Failure is recorded only
    Warn,
}

impl Severity {
    /// Returns the lowercase name used in configuration and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = QualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warn" | "warning" => Ok(Severity::Warn),
            _ => Err(QualityError::InvalidSeverity(s.to_string())),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = QualityError;

    fn try_from(value: String) -> Result<Self, <Self as TryFrom<String>>::Error> {
        value.parse()
    }
}

/// Identity and presentation attributes shared by every rule.
///
/// # Example
///
/// ```rust
/// use aqualisys_core::{RuleMeta, Severity};
///
/// let meta = RuleMeta::new("NotNullRule", ["order_id"])
///     .with_severity(Severity::Warn)
///     .with_tags(["Integrity"]);
///
/// assert_eq!(meta.id(), "NotNullRule::order_id");
/// assert!(meta.tags().contains("integrity"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMeta {
    rule_type: String,
    target: String,
    columns: Vec<String>,
    name: Option<String>,
    severity: Severity,
    tags: BTreeSet<String>,
    description: Option<String>,
}

impl RuleMeta {
    /// Creates metadata for a rule targeting the given columns.
    pub fn new<I, S>(rule_type: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        Self {
            rule_type: rule_type.into(),
            target: columns.join(","),
            columns,
            name: None,
            severity: Severity::Error,
            tags: BTreeSet::new(),
            description: None,
        }
    }

    /// Creates metadata for a rule whose identity is not a column.
    ///
    /// Expression rules use the expression text as their target.
    pub fn for_target(rule_type: impl Into<String>, target: impl Into<String>) -> Self {
        let mut meta = Self::new(rule_type, std::iter::empty::<String>());
        meta.target = target.into();
        meta
    }

    /// Sets an explicit instance name, which becomes the rule id.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the configured severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Adds tags; tags are stored lower-cased.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags
            .extend(tags.into_iter().map(|t| t.as_ref().trim().to_lowercase()));
        self
    }

    /// Sets the human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Rule id: the instance name, or `<RuleType>::<target>`.
    pub fn id(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.canonical_key(),
        }
    }

    /// `<RuleType>::<target>`, regardless of any instance name.
    pub fn canonical_key(&self) -> String {
        format!("{}::{}", self.rule_type, self.target)
    }

    /// Returns true if `key` is the instance name or the canonical key.
    pub fn matches_key(&self, key: &str) -> bool {
        self.name.as_deref() == Some(key) || self.canonical_key() == key
    }

    /// Stable rule type name.
    pub fn rule_type(&self) -> &str {
        &self.rule_type
    }

    /// Target columns (empty for expression rules).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Target columns joined for storage, or `None` when there are none.
    pub fn column_label(&self) -> Option<String> {
        if self.columns.is_empty() {
            None
        } else {
            Some(self.columns.join(","))
        }
    }

    /// Configured severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Tags used for selection.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Description, falling back to `<RuleType> on <target>`.
    pub fn description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("{} on {}", self.rule_type, self.target))
    }

    /// Returns true if any of the rule's tags is in `tags`.
    pub fn has_any_tag(&self, tags: &BTreeSet<String>) -> bool {
        !self.tags.is_disjoint(tags)
    }
}

/// Raw result of evaluating one rule, before the checker attaches identity,
/// severity and timing.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Whether the rule held
    pub passed: bool,
    /// Primary metric, usually a violation count
    pub metric_value: f64,
    /// Structured metric detail
    pub detail: JsonValue,
    /// Short human-readable summary
    pub message: String,
}

impl Evaluation {
    /// Builds an evaluation from a violation count: zero violations pass.
    pub fn from_violations(
        violations: usize,
        detail: JsonValue,
        ok_message: &str,
        fail_message: impl FnOnce(usize) -> String,
    ) -> Self {
        let passed = violations == 0;
        Self {
            passed,
            metric_value: violations as f64,
            detail,
            message: if passed {
                ok_message.to_string()
            } else {
                fail_message(violations)
            },
        }
    }
}

/// Core trait for data-quality rules.
///
/// Implementations must not mutate the dataset and must be deterministic for a
/// fixed dataset and parameters.
///
/// # Example
///
/// ```rust
/// use aqualisys_core::{DataSet, Evaluation, EvaluationError, Rule, RuleMeta};
///
/// #[derive(Debug)]
/// struct NonEmpty {
///     meta: RuleMeta,
/// }
///
/// impl Rule for NonEmpty {
///     fn meta(&self) -> &RuleMeta {
///         &self.meta
///     }
///
///     fn evaluate(&self, dataset: &DataSet) -> Result<Evaluation, EvaluationError> {
///         let violations = usize::from(dataset.is_empty());
///         Ok(Evaluation::from_violations(
///             violations,
///             serde_json::json!({ "row_count": dataset.len() }),
///             "dataset has rows",
///             |_| "dataset is empty".to_string(),
///         ))
///     }
/// }
///
/// let rule = NonEmpty { meta: RuleMeta::for_target("NonEmptyRule", "table") };
/// assert!(!rule.evaluate(&DataSet::empty()).unwrap().passed);
/// ```
pub trait Rule: Send + Sync + fmt::Debug {
    /// Identity and presentation attributes.
    fn meta(&self) -> &RuleMeta;

    /// Evaluates the rule against a dataset.
    fn evaluate(&self, dataset: &DataSet) -> Result<Evaluation, EvaluationError>;

    /// Rule id, see [`RuleMeta::id`].
    fn id(&self) -> String {
        self.meta().id()
    }
}
