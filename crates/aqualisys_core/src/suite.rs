//! Declarative suite and rule specifications.
//!
//! These are plain serde structures produced by the parser crate. A
//! [`RuleSpec`] is turned into a rule by the registry; a [`SuiteConfig`] bundles
//! the dataset, its reference datasets, the rules and the run selectors.

use crate::{QualityError, Result, RunOptions, Severity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Declarative description of one rule.
///
/// Keys other than the common ones are kept in `parameters` for the rule's
/// factory to interpret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Registry key, e.g. `not_null`
    #[serde(rename = "type")]
    pub rule_type: String,

    /// Optional instance name, used as the rule id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Target column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// Configured severity, `error` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    /// Selection tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Rule-specific parameters
    #[serde(flatten)]
    pub parameters: Map<String, JsonValue>,
}

impl RuleSpec {
    /// Creates a spec with only a type.
    pub fn new(rule_type: impl Into<String>) -> Self {
        Self {
            rule_type: rule_type.into(),
            name: None,
            column: None,
            severity: None,
            tags: Vec::new(),
            description: None,
            parameters: Map::new(),
        }
    }

    /// Returns a raw parameter.
    pub fn param(&self, key: &str) -> Option<&JsonValue> {
        self.parameters.get(key)
    }

    /// Returns the target column or a configuration error.
    pub fn require_column(&self) -> Result<&str> {
        match self.column.as_deref().map(str::trim) {
            Some(column) if !column.is_empty() => Ok(column),
            _ => Err(QualityError::rule_config(
                &self.rule_type,
                "missing required parameter 'column'",
            )),
        }
    }

    /// Returns a string parameter or a configuration error.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        match self.param(key) {
            Some(JsonValue::String(value)) if !value.trim().is_empty() => Ok(value),
            Some(JsonValue::String(_)) => Err(QualityError::rule_config(
                &self.rule_type,
                format!("parameter '{}' must not be empty", key),
            )),
            Some(other) => Err(QualityError::rule_config(
                &self.rule_type,
                format!("parameter '{}' must be a string, got {}", key, other),
            )),
            None => Err(QualityError::rule_config(
                &self.rule_type,
                format!("missing required parameter '{}'", key),
            )),
        }
    }

    /// Returns the first present parameter among `keys`.
    pub fn param_any<'k>(&self, keys: &[&'k str]) -> Option<(&'k str, &JsonValue)> {
        keys.iter()
            .find_map(|key| self.param(key).map(|value| (*key, value)))
    }
}

/// On-disk format of a dataset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// Apache Parquet
    #[default]
    Parquet,
    /// Comma-separated values with a header row
    Csv,
    /// Newline-delimited JSON
    #[serde(alias = "ndjson")]
    Json,
}

/// Location of a dataset file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    /// File path
    pub path: PathBuf,

    /// File format
    #[serde(default)]
    pub format: DataFormat,
}

/// The dataset a suite validates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset name recorded in reports
    pub name: String,

    /// File path
    pub path: PathBuf,

    /// File format
    #[serde(default)]
    pub format: DataFormat,
}

impl DatasetConfig {
    /// Returns the file location of the dataset.
    pub fn source(&self) -> DataSource {
        DataSource {
            path: self.path.clone(),
            format: self.format,
        }
    }
}

/// Where run records are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// SQLite database path
    #[serde(default = "default_logger_path")]
    pub path: PathBuf,

    /// Set to false to skip persistence
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            path: default_logger_path(),
            enabled: true,
        }
    }
}

fn default_logger_path() -> PathBuf {
    PathBuf::from("aqualisys_runs.db")
}

fn default_true() -> bool {
    true
}

/// Tag selectors stored in a suite file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selectors {
    /// Include tags
    #[serde(default)]
    pub include_tags: Vec<String>,

    /// Exclude tags
    #[serde(default)]
    pub exclude_tags: Vec<String>,
}

/// A complete validation suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Dataset under validation
    pub dataset: DatasetConfig,

    /// Named reference datasets for relationship rules
    #[serde(default)]
    pub references: BTreeMap<String, DataSource>,

    /// Stop after the first failing error-severity rule
    #[serde(default)]
    pub fail_fast: bool,

    /// Rules in execution order
    #[serde(default)]
    pub rules: Vec<RuleSpec>,

    /// Persistence settings
    #[serde(default)]
    pub logger: LoggerConfig,

    /// Tag selectors
    #[serde(default)]
    pub selectors: Selectors,

    /// Severity overrides keyed by rule id
    #[serde(default)]
    pub severity_overrides: BTreeMap<String, Severity>,
}

/// Command-line overrides merged into a suite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuiteOverrides {
    /// Extra include tags
    pub include_tags: Vec<String>,
    /// Extra exclude tags
    pub exclude_tags: Vec<String>,
    /// Overrides replacing same-key entries of the suite
    pub severity_overrides: BTreeMap<String, Severity>,
    /// Replaces the suite's fail-fast flag when set
    pub fail_fast: Option<bool>,
}

impl SuiteConfig {
    /// Merges overrides: tags are appended, same-key severities replaced.
    pub fn with_overrides(mut self, overrides: SuiteOverrides) -> Self {
        self.selectors.include_tags.extend(overrides.include_tags);
        self.selectors.exclude_tags.extend(overrides.exclude_tags);
        self.severity_overrides.extend(overrides.severity_overrides);
        if let Some(fail_fast) = overrides.fail_fast {
            self.fail_fast = fail_fast;
        }
        self
    }

    /// Builds the run options described by the suite.
    pub fn run_options(&self) -> RunOptions {
        let mut options = RunOptions::new()
            .with_include_tags(&self.selectors.include_tags)
            .with_exclude_tags(&self.selectors.exclude_tags)
            .with_fail_fast(self.fail_fast);
        for (rule_id, severity) in &self.severity_overrides {
            options = options.with_severity_override(rule_id.clone(), *severity);
        }
        options
    }

    /// Makes relative file paths relative to `base` instead of the working directory.
    pub fn resolve_paths(&mut self, base: &Path) {
        resolve(&mut self.dataset.path, base);
        resolve(&mut self.logger.path, base);
        for source in self.references.values_mut() {
            resolve(&mut source.path, base);
        }
    }
}

fn resolve(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn suite() -> SuiteConfig {
        SuiteConfig {
            dataset: DatasetConfig {
                name: "orders".to_string(),
                path: PathBuf::from("orders.csv"),
                format: DataFormat::Csv,
            },
            references: BTreeMap::new(),
            fail_fast: false,
            rules: Vec::new(),
            logger: LoggerConfig::default(),
            selectors: Selectors {
                include_tags: vec!["Integrity".to_string()],
                exclude_tags: Vec::new(),
            },
            severity_overrides: BTreeMap::from([(
                "UniqueRule::order_id".to_string(),
                Severity::Warn,
            )]),
        }
    }

    #[test]
    fn test_rule_spec_flattens_parameters() {
        let spec: RuleSpec = serde_json::from_value(serde_json::json!({
            "type": "accepted_values",
            "column": "status",
            "values": ["pending", "shipped"],
            "severity": "warn",
        }))
        .unwrap();

        assert_eq!(spec.rule_type, "accepted_values");
        assert_eq!(spec.require_column().unwrap(), "status");
        assert_eq!(spec.severity, Some(Severity::Warn));
        assert!(spec.param("values").unwrap().is_array());
        assert!(spec.param("column").is_none());
    }

    #[test]
    fn test_rule_spec_parameter_errors() {
        let mut spec = RuleSpec::new("expression");
        assert!(matches!(
            spec.require_column(),
            Err(QualityError::RuleConfiguration { .. })
        ));
        assert!(spec.require_str("expression").is_err());

        spec.parameters
            .insert("expression".to_string(), serde_json::json!(42));
        let err = spec.require_str("expression").unwrap_err();
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn test_overrides_merge() {
        let merged = suite().with_overrides(SuiteOverrides {
            include_tags: vec!["nulls".to_string()],
            exclude_tags: vec!["slow".to_string()],
            severity_overrides: BTreeMap::from([(
                "UniqueRule::order_id".to_string(),
                Severity::Error,
            )]),
            fail_fast: Some(true),
        });

        let options = merged.run_options();
        assert!(options.include_tags.contains("integrity"));
        assert!(options.include_tags.contains("nulls"));
        assert!(options.exclude_tags.contains("slow"));
        assert_eq!(
            options.severity_overrides.get("UniqueRule::order_id"),
            Some(&Severity::Error)
        );
        assert!(options.fail_fast);
    }

    #[test]
    fn test_fail_fast_untouched_without_override() {
        let mut base = suite();
        base.fail_fast = true;
        let merged = base.with_overrides(SuiteOverrides::default());
        assert!(merged.fail_fast);
    }

    #[test]
    fn test_resolve_paths() {
        let mut config = suite();
        config.references.insert(
            "customers".to_string(),
            DataSource {
                path: PathBuf::from("/abs/customers.csv"),
                format: DataFormat::Csv,
            },
        );
        config.resolve_paths(Path::new("/suites"));

        assert_eq!(config.dataset.path, PathBuf::from("/suites/orders.csv"));
        assert_eq!(config.logger.path, PathBuf::from("/suites/aqualisys_runs.db"));
        assert_eq!(
            config.references["customers"].path,
            PathBuf::from("/abs/customers.csv")
        );
    }
}
