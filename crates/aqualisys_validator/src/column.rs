//! Single-column rules.
//!
//! - [`NotNullRule`]: no null or missing values
//! - [`UniqueRule`]: no duplicated non-null values
//! - [`AcceptedValuesRule`]: every non-null value is in an allowed set

use aqualisys_core::{
    DataSet, DataValue, Evaluation, EvaluationError, QualityError, Result, Rule, RuleMeta,
    ValueKey,
};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

/// Maximum number of example values kept in a metric detail.
pub const SAMPLE_LIMIT: usize = 5;

/// Checks that a column name is usable.
pub(crate) fn require_column(rule_type: &str, column: impl Into<String>) -> Result<String> {
    let column = column.into();
    if column.trim().is_empty() {
        return Err(QualityError::rule_config(
            rule_type,
            "column name must not be empty",
        ));
    }
    Ok(column)
}

/// Looks up a column, failing the evaluation when it is absent.
pub(crate) fn column_values<'a>(
    dataset: &'a DataSet,
    column: &str,
) -> std::result::Result<impl Iterator<Item = &'a DataValue>, EvaluationError> {
    dataset
        .column(column)
        .ok_or_else(|| EvaluationError::MissingColumn(column.to_string()))
}

/// Renders the first [`SAMPLE_LIMIT`] values of a sorted map as JSON.
pub(crate) fn sample_json(values: &BTreeMap<ValueKey, DataValue>) -> serde_json::Value {
    values
        .values()
        .take(SAMPLE_LIMIT)
        .map(DataValue::to_json)
        .collect()
}

/// Fails when a column holds any null or missing value.
///
/// # Example
///
/// ```rust
/// use aqualisys_core::{DataSet, Rule};
/// use aqualisys_validator::NotNullRule;
///
/// let dataset = DataSet::from_columns([("order_id", vec![Some(1_i64), None, Some(3)])]);
/// let rule = NotNullRule::new("order_id").unwrap();
///
/// let evaluation = rule.evaluate(&dataset).unwrap();
/// assert!(!evaluation.passed);
/// assert_eq!(evaluation.metric_value, 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct NotNullRule {
    meta: RuleMeta,
    column: String,
}

impl NotNullRule {
    /// Type name used in rule ids.
    pub const TYPE: &'static str = "NotNullRule";

    /// Creates a rule for `column`.
    pub fn new(column: impl Into<String>) -> Result<Self> {
        let column = require_column(Self::TYPE, column)?;
        Ok(Self {
            meta: RuleMeta::new(Self::TYPE, [column.clone()]),
            column,
        })
    }
}

impl_meta_builders!(NotNullRule);

impl Rule for NotNullRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, dataset: &DataSet) -> std::result::Result<Evaluation, EvaluationError> {
        let null_count = column_values(dataset, &self.column)?
            .filter(|v| v.is_null())
            .count();

        Ok(Evaluation::from_violations(
            null_count,
            json!({ "null_count": null_count, "row_count": dataset.len() }),
            "no null values",
            |n| format!("{} null values in '{}'", n, self.column),
        ))
    }
}

/// Fails when a column holds duplicated non-null values.
///
/// The metric is the number of non-null rows minus the number of distinct
/// non-null values, i.e. how many rows would have to go for the column to be
/// unique.
#[derive(Debug, Clone)]
pub struct UniqueRule {
    meta: RuleMeta,
    column: String,
}

impl UniqueRule {
    /// Type name used in rule ids.
    pub const TYPE: &'static str = "UniqueRule";

    /// Creates a rule for `column`.
    pub fn new(column: impl Into<String>) -> Result<Self> {
        let column = require_column(Self::TYPE, column)?;
        Ok(Self {
            meta: RuleMeta::new(Self::TYPE, [column.clone()]),
            column,
        })
    }
}

impl_meta_builders!(UniqueRule);

impl Rule for UniqueRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, dataset: &DataSet) -> std::result::Result<Evaluation, EvaluationError> {
        let mut counts: BTreeMap<ValueKey, (usize, &DataValue)> = BTreeMap::new();
        let mut non_null = 0usize;

        for value in column_values(dataset, &self.column)? {
            if let Some(key) = value.key() {
                non_null += 1;
                counts.entry(key).or_insert((0, value)).0 += 1;
            }
        }

        let duplicate_count = non_null - counts.len();
        let duplicated: BTreeMap<ValueKey, DataValue> = counts
            .into_iter()
            .filter(|(_, (count, _))| *count > 1)
            .map(|(key, (_, value))| (key, value.clone()))
            .collect();

        Ok(Evaluation::from_violations(
            duplicate_count,
            json!({
                "duplicate_count": duplicate_count,
                "distinct_count": non_null - duplicate_count,
                "non_null_count": non_null,
                "sample_duplicates": sample_json(&duplicated),
            }),
            "all values are unique",
            |n| format!("{} duplicate values in '{}'", n, self.column),
        ))
    }
}

/// Fails when a non-null value falls outside an allowed set.
///
/// Values compare by [`ValueKey`], so numbers compare by value (`1` equals
/// `1.0`) and strings compare exactly.
#[derive(Debug, Clone)]
pub struct AcceptedValuesRule {
    meta: RuleMeta,
    column: String,
    allowed: BTreeMap<ValueKey, DataValue>,
}

impl AcceptedValuesRule {
    /// Type name used in rule ids.
    pub const TYPE: &'static str = "AcceptedValuesRule";

    /// Creates a rule for `column` accepting `values`.
    ///
    /// # Errors
    ///
    /// Returns `RuleConfiguration` if the column is empty or the allowed set
    /// contains no non-null value.
    pub fn new<I, V>(column: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<DataValue>,
    {
        let column = require_column(Self::TYPE, column)?;
        let allowed: BTreeMap<ValueKey, DataValue> = values
            .into_iter()
            .map(Into::into)
            .filter_map(|value: DataValue| value.key().map(|key| (key, value)))
            .collect();

        if allowed.is_empty() {
            return Err(QualityError::rule_config(
                Self::TYPE,
                "accepted values must not be empty",
            ));
        }

        Ok(Self {
            meta: RuleMeta::new(Self::TYPE, [column.clone()]),
            column,
            allowed,
        })
    }

    /// The allowed keys.
    pub fn allowed(&self) -> BTreeSet<&ValueKey> {
        self.allowed.keys().collect()
    }
}

impl_meta_builders!(AcceptedValuesRule);

impl Rule for AcceptedValuesRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, dataset: &DataSet) -> std::result::Result<Evaluation, EvaluationError> {
        let mut violations = 0usize;
        let mut offending: BTreeMap<ValueKey, DataValue> = BTreeMap::new();

        for value in column_values(dataset, &self.column)? {
            let Some(key) = value.key() else { continue };
            if !self.allowed.contains_key(&key) {
                violations += 1;
                offending.entry(key).or_insert_with(|| value.clone());
            }
        }

        let allowed: serde_json::Value = self.allowed.values().map(DataValue::to_json).collect();

        Ok(Evaluation::from_violations(
            violations,
            json!({
                "violation_count": violations,
                "allowed_values": allowed,
                "sample_offending": sample_json(&offending),
            }),
            "all values accepted",
            |n| format!("{} values in '{}' outside the accepted set", n, self.column),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqualisys_core::Severity;
    use pretty_assertions::assert_eq;

    fn ids(values: Vec<Option<i64>>) -> DataSet {
        DataSet::from_columns([("id", values)])
    }

    #[test]
    fn test_not_null_counts_nulls() {
        let rule = NotNullRule::new("id").unwrap();
        let evaluation = rule.evaluate(&ids(vec![Some(1), None, Some(3)])).unwrap();

        assert!(!evaluation.passed);
        assert_eq!(evaluation.metric_value, 1.0);
        assert_eq!(evaluation.detail["null_count"], 1);
        assert_eq!(evaluation.detail["row_count"], 3);
    }

    #[test]
    fn test_not_null_passes_on_empty_dataset() {
        let dataset = DataSet::empty().with_columns(["id"]);
        let evaluation = NotNullRule::new("id").unwrap().evaluate(&dataset).unwrap();
        assert!(evaluation.passed);
        assert_eq!(evaluation.metric_value, 0.0);
    }

    #[test]
    fn test_missing_column_is_evaluation_error() {
        let err = NotNullRule::new("missing")
            .unwrap()
            .evaluate(&ids(vec![Some(1)]))
            .unwrap_err();
        assert_eq!(err, EvaluationError::MissingColumn("missing".to_string()));
    }

    #[test]
    fn test_empty_column_name_rejected() {
        assert!(matches!(
            UniqueRule::new("  "),
            Err(QualityError::RuleConfiguration { .. })
        ));
    }

    #[test]
    fn test_unique_counts_duplicates() {
        let rule = UniqueRule::new("id").unwrap();
        let evaluation = rule.evaluate(&ids(vec![Some(1), Some(2), Some(2)])).unwrap();

        assert!(!evaluation.passed);
        assert_eq!(evaluation.metric_value, 1.0);
        assert_eq!(evaluation.detail["sample_duplicates"], json!([2]));
    }

    #[test]
    fn test_unique_ignores_nulls() {
        let rule = UniqueRule::new("id").unwrap();
        let evaluation = rule.evaluate(&ids(vec![Some(1), None, None])).unwrap();
        assert!(evaluation.passed);
    }

    #[test]
    fn test_unique_numeric_equality() {
        let dataset = DataSet::from_columns([("id", vec![DataValue::Int(1), DataValue::Float(1.0)])]);
        let evaluation = UniqueRule::new("id").unwrap().evaluate(&dataset).unwrap();
        assert_eq!(evaluation.metric_value, 1.0);
    }

    #[test]
    fn test_unique_sample_is_sorted_and_bounded() {
        let values: Vec<Option<i64>> = (0..8).rev().flat_map(|v| [Some(v), Some(v)]).collect();
        let evaluation = UniqueRule::new("id").unwrap().evaluate(&ids(values)).unwrap();

        assert_eq!(evaluation.metric_value, 8.0);
        assert_eq!(evaluation.detail["sample_duplicates"], json!([0, 1, 2, 3, 4]));
    }

    #[test]
    fn test_accepted_values_flags_outsiders() {
        let dataset = DataSet::from_columns([(
            "status",
            vec![Some("pending"), Some("shipped"), Some("cancelled"), None],
        )]);
        let rule = AcceptedValuesRule::new("status", ["pending", "shipped"]).unwrap();

        let evaluation = rule.evaluate(&dataset).unwrap();
        assert!(!evaluation.passed);
        assert_eq!(evaluation.metric_value, 1.0);
        assert_eq!(evaluation.detail["sample_offending"], json!(["cancelled"]));
    }

    #[test]
    fn test_accepted_values_compares_numbers_by_value() {
        let dataset = DataSet::from_columns([("level", vec![DataValue::Float(2.0)])]);
        let rule = AcceptedValuesRule::new("level", [1_i64, 2]).unwrap();
        assert!(rule.evaluate(&dataset).unwrap().passed);
    }

    #[test]
    fn test_accepted_values_requires_values() {
        let result = AcceptedValuesRule::new("status", Vec::<DataValue>::new());
        assert!(matches!(result, Err(QualityError::RuleConfiguration { .. })));
    }

    #[test]
    fn test_meta_builders() {
        let rule = NotNullRule::new("id")
            .unwrap()
            .with_severity(Severity::Warn)
            .with_tags(["Critical"])
            .with_name("id_present");

        assert_eq!(rule.id(), "id_present");
        assert_eq!(rule.meta().severity(), Severity::Warn);
        assert!(rule.meta().tags().contains("critical"));
    }
}
