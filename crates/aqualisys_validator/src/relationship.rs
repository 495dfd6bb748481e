//! Referential integrity between two datasets.

use crate::column::{column_values, require_column, sample_json};
use aqualisys_core::{
    DataSet, DataValue, Evaluation, EvaluationError, QualityError, Result, Rule, RuleMeta,
    ValueKey,
};
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Fails when a non-null source value is absent from a reference column.
///
/// The reference dataset is bound when the rule is built and shared by handle,
/// so one reference table can back any number of rules.
///
/// # Example
///
/// ```rust
/// use aqualisys_core::{DataSet, Rule};
/// use aqualisys_validator::RelationshipRule;
/// use std::sync::Arc;
///
/// let customers = Arc::new(DataSet::from_columns([("id", vec![1_i64, 2])]));
/// let orders = DataSet::from_columns([("customer_id", vec![Some(1_i64), Some(3), None])]);
///
/// let rule = RelationshipRule::new("customer_id", "customers", "id", customers).unwrap();
/// let evaluation = rule.evaluate(&orders).unwrap();
/// assert_eq!(evaluation.metric_value, 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct RelationshipRule {
    meta: RuleMeta,
    column: String,
    reference_name: String,
    reference_column: String,
    reference: Arc<DataSet>,
}

impl RelationshipRule {
    /// Type name used in rule ids.
    pub const TYPE: &'static str = "RelationshipRule";

    /// Creates a rule checking `column` against `reference_column` of the
    /// dataset known as `reference_name`.
    pub fn new(
        column: impl Into<String>,
        reference_name: impl Into<String>,
        reference_column: impl Into<String>,
        reference: Arc<DataSet>,
    ) -> Result<Self> {
        let column = require_column(Self::TYPE, column)?;
        let reference_column = require_column(Self::TYPE, reference_column)?;
        let reference_name = reference_name.into();
        if reference_name.trim().is_empty() {
            return Err(QualityError::rule_config(
                Self::TYPE,
                "reference dataset name must not be empty",
            ));
        }

        Ok(Self {
            meta: RuleMeta::new(Self::TYPE, [column.clone()]),
            column,
            reference_name,
            reference_column,
            reference,
        })
    }

    /// Name of the reference dataset.
    pub fn reference_name(&self) -> &str {
        &self.reference_name
    }
}

impl_meta_builders!(RelationshipRule);

impl Rule for RelationshipRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, dataset: &DataSet) -> std::result::Result<Evaluation, EvaluationError> {
        let known: HashSet<ValueKey> = self
            .reference
            .column(&self.reference_column)
            .ok_or_else(|| EvaluationError::MissingReferenceColumn {
                dataset: self.reference_name.clone(),
                column: self.reference_column.clone(),
            })?
            .filter_map(DataValue::key)
            .collect();

        let mut unmatched_rows = 0usize;
        let mut unmatched: BTreeMap<ValueKey, DataValue> = BTreeMap::new();
        for value in column_values(dataset, &self.column)? {
            let Some(key) = value.key() else { continue };
            if !known.contains(&key) {
                unmatched_rows += 1;
                unmatched.entry(key).or_insert_with(|| value.clone());
            }
        }

        Ok(Evaluation::from_violations(
            unmatched_rows,
            json!({
                "unmatched_count": unmatched_rows,
                "reference_dataset": self.reference_name,
                "reference_column": self.reference_column,
                "reference_row_count": self.reference.len(),
                "sample_unmatched": sample_json(&unmatched),
            }),
            "all values found in reference",
            |n| {
                format!(
                    "{} values in '{}' not found in {}.{}",
                    n, self.column, self.reference_name, self.reference_column
                )
            },
        ))
    }
}
