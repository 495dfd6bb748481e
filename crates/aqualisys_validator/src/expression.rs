//! SQL boolean expressions evaluated per row by DataFusion.

use crate::session::{DATASET_TABLE, block_on, query_counts, session_with_dataset};
use aqualisys_core::{DataSet, Evaluation, EvaluationError, QualityError, Result, Rule, RuleMeta};
use regex::Regex;
use serde_json::json;

/// Statement keywords an expression may not contain.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "DROP",
    "DELETE",
    "INSERT",
    "UPDATE",
    "CREATE",
    "ALTER",
    "TRUNCATE",
    "GRANT",
    "REVOKE",
    "EXECUTE",
    "EXEC",
    "CALL",
    "MERGE",
    "RENAME",
    "ATTACH",
    "DETACH",
    "COPY",
    "COMMIT",
    "ROLLBACK",
    "BEGIN",
    "TRANSACTION",
];

/// Rejects expressions that are empty or could be more than a predicate.
fn validate_expression(expression: &str) -> Result<()> {
    if expression.trim().is_empty() {
        return Err(QualityError::rule_config(
            ExpressionRule::TYPE,
            "expression must not be empty",
        ));
    }

    // Literal and quoted identifier text is data, not SQL
    let code = mask_quoted(expression)?;

    let pattern = format!(r"(?i)\b({})\b", FORBIDDEN_KEYWORDS.join("|"));
    let forbidden = Regex::new(&pattern).map_err(|e| {
        QualityError::rule_config(ExpressionRule::TYPE, format!("invalid keyword pattern: {e}"))
    })?;
    if let Some(found) = forbidden.find(&code) {
        return Err(QualityError::rule_config(
            ExpressionRule::TYPE,
            format!(
                "expression contains forbidden keyword: {}",
                found.as_str().to_uppercase()
            ),
        ));
    }

    if code.contains(';') {
        return Err(QualityError::rule_config(
            ExpressionRule::TYPE,
            "expression cannot contain semicolons",
        ));
    }

    if code.contains("--") || code.contains("/*") || code.contains("*/") {
        return Err(QualityError::rule_config(
            ExpressionRule::TYPE,
            "expression cannot contain comments",
        ));
    }

    Ok(())
}

/// Returns `expression` with the contents of `'...'` literals and `"..."`
/// identifiers blanked out. A doubled quote inside a quoted run is an escape.
fn mask_quoted(expression: &str) -> Result<String> {
    let mut masked = String::with_capacity(expression.len());
    let mut open: Option<char> = None;
    let mut chars = expression.chars().peekable();

    while let Some(c) = chars.next() {
        match open {
            None => {
                if c == '\'' || c == '"' {
                    open = Some(c);
                }
                masked.push(c);
            }
            Some(quote) if c == quote => {
                if chars.peek() == Some(&quote) {
                    chars.next();
                    masked.push(' ');
                } else {
                    open = None;
                    masked.push(c);
                }
            }
            Some(_) => masked.push(' '),
        }
    }

    if open.is_some() {
        return Err(QualityError::rule_config(
            ExpressionRule::TYPE,
            "expression has an unterminated quote",
        ));
    }
    Ok(masked)
}

/// Fails when any row makes a SQL boolean expression false or null.
///
/// The expression is handed to DataFusion as the condition of a `CASE WHEN`
/// over the dataset, registered as a table named `dataset`. Unquoted column
/// names are case-folded by DataFusion.
///
/// # Example
///
/// ```rust
/// use aqualisys_core::{DataSet, Rule};
/// use aqualisys_validator::ExpressionRule;
///
/// let dataset = DataSet::from_columns([("total", vec![Some(10_i64), Some(-5), None])]);
/// let rule = ExpressionRule::new("total >= 0").unwrap();
///
/// let evaluation = rule.evaluate(&dataset).unwrap();
/// assert_eq!(evaluation.detail["false_count"], 1);
/// assert_eq!(evaluation.detail["null_count"], 1);
/// assert_eq!(evaluation.metric_value, 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct ExpressionRule {
    meta: RuleMeta,
    expression: String,
}

impl ExpressionRule {
    /// Type name used in rule ids.
    pub const TYPE: &'static str = "ExpressionRule";

    /// Creates a rule for a boolean SQL expression.
    ///
    /// # Errors
    ///
    /// Returns `RuleConfiguration` for an empty expression, statement keywords
    /// such as `DROP`, semicolons or SQL comments.
    pub fn new(expression: impl Into<String>) -> Result<Self> {
        let expression = expression.into().trim().to_string();
        validate_expression(&expression)?;

        Ok(Self {
            meta: RuleMeta::for_target(Self::TYPE, expression.clone()),
            expression,
        })
    }

    /// The expression text.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    fn count_query(&self) -> String {
        format!(
            "SELECT COUNT(*) AS total, \
             COUNT(CASE WHEN ({expr}) THEN 1 END) AS satisfied, \
             COUNT(CASE WHEN ({expr}) IS NULL THEN 1 END) AS indeterminate \
             FROM {table}",
            expr = self.expression,
            table = DATASET_TABLE,
        )
    }
}

impl_meta_builders!(ExpressionRule);

impl Rule for ExpressionRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, dataset: &DataSet) -> std::result::Result<Evaluation, EvaluationError> {
        let sql = self.count_query();
        let counts = block_on(async {
            let ctx = session_with_dataset(dataset)?;
            query_counts(&ctx, &sql).await
        })?;

        let [total, satisfied, null_count] = counts[..] else {
            return Err(EvaluationError::engine(format!(
                "expected 3 counters, got {}",
                counts.len()
            )));
        };
        let false_count = total - satisfied - null_count;
        let violations = usize::try_from(false_count + null_count).unwrap_or(0);

        Ok(Evaluation::from_violations(
            violations,
            json!({
                "expression": self.expression,
                "row_count": total,
                "false_count": false_count,
                "null_count": null_count,
            }),
            "expression holds for every row",
            |n| format!("expression '{}' not satisfied by {} rows", self.expression, n),
        ))
    }
}
