//! Parser for Aqualisys validation suites (YAML/TOML formats).
//!
//! This module parses suite files into the strongly-typed [`SuiteConfig`]
//! structure. Parsing only checks shape; whether a rule's parameters make sense
//! is decided later by the rule registry.
//!
//! # Example
//!
//! ```rust
//! use aqualisys_parser::parse_yaml;
//!
//! let yaml = r#"
//! dataset:
//!   name: orders
//!   path: data/orders.csv
//!   format: csv
//! rules:
//!   - type: not_null
//!     column: order_id
//! "#;
//!
//! let suite = parse_yaml(yaml).expect("Failed to parse suite");
//! assert_eq!(suite.dataset.name, "orders");
//! assert_eq!(suite.rules.len(), 1);
//! ```

use aqualisys_core::SuiteConfig;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during suite parsing.
#[derive(Debug, Error)]
pub enum ParserError {
    /// YAML parsing or deserialization failed
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    /// TOML parsing or deserialization failed
    #[error("Failed to parse TOML: {0}")]
    TomlError(String),

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unsupported file format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Invalid file extension
    #[error("Invalid or missing file extension")]
    InvalidExtension,

    /// The suite parsed but is not usable
    #[error("Invalid suite: {0}")]
    InvalidSuite(String),
}

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Supported suite file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteFormat {
    /// YAML format (.yml, .yaml)
    Yaml,
    /// TOML format (.toml)
    Toml,
}

/// Parse a suite from a YAML string.
pub fn parse_yaml(content: &str) -> Result<SuiteConfig> {
    let suite: SuiteConfig = serde_yaml_ng::from_str(content)?;
    normalize(suite)
}

/// Parse a suite from a TOML string.
///
/// # Example
///
/// ```rust
/// use aqualisys_parser::parse_toml;
///
/// let toml = r#"
/// fail_fast = true
///
/// [dataset]
/// name = "orders"
/// path = "orders.parquet"
///
/// [[rules]]
/// type = "unique"
/// column = "order_id"
/// "#;
///
/// let suite = parse_toml(toml).unwrap();
/// assert!(suite.fail_fast);
/// ```
pub fn parse_toml(content: &str) -> Result<SuiteConfig> {
    let suite: SuiteConfig =
        toml::from_str(content).map_err(|e| ParserError::TomlError(e.to_string()))?;
    normalize(suite)
}

/// Detect the suite format from a file path based on its extension.
///
/// # Supported Extensions
///
/// * `.yaml`, `.yml` → `SuiteFormat::Yaml`
/// * `.toml` → `SuiteFormat::Toml`
///
/// # Errors
///
/// Returns `ParserError::InvalidExtension` if the file has no extension.
/// Returns `ParserError::UnsupportedFormat` if the extension is not recognized.
pub fn detect_format(path: &Path) -> Result<SuiteFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or(ParserError::InvalidExtension)?;

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(SuiteFormat::Yaml),
        "toml" => Ok(SuiteFormat::Toml),
        other => Err(ParserError::UnsupportedFormat(other.to_string())),
    }
}

/// Parse a suite from a file with automatic format detection.
///
/// Relative dataset, reference and logger paths are resolved against the
/// directory containing the suite file.
///
/// ```no_run
/// use aqualisys_parser::parse_file;
/// use std::path::Path;
///
/// let suite = parse_file(Path::new("suites/orders.yml")).unwrap();
/// println!("Loaded suite for {}", suite.dataset.name);
/// ```
pub fn parse_file(path: &Path) -> Result<SuiteConfig> {
    let content = std::fs::read_to_string(path)?;
    let format = detect_format(path)?;

    let mut suite = match format {
        SuiteFormat::Yaml => parse_yaml(&content)?,
        SuiteFormat::Toml => parse_toml(&content)?,
    };

    if let Some(base) = path.parent() {
        suite.resolve_paths(base);
    }
    Ok(suite)
}

/// Lower-cases selector tags and rejects suites that cannot run.
fn normalize(mut suite: SuiteConfig) -> Result<SuiteConfig> {
    if suite.dataset.name.trim().is_empty() {
        return Err(ParserError::InvalidSuite(
            "dataset name must not be empty".to_string(),
        ));
    }

    for (index, rule) in suite.rules.iter().enumerate() {
        if rule.rule_type.trim().is_empty() {
            return Err(ParserError::InvalidSuite(format!(
                "rule #{} is missing 'type'",
                index + 1
            )));
        }
    }

    for tags in [
        &mut suite.selectors.include_tags,
        &mut suite.selectors.exclude_tags,
    ] {
        for tag in tags.iter_mut() {
            *tag = tag.trim().to_lowercase();
        }
    }

    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqualisys_core::{DataFormat, Severity};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_parse_valid_yaml_minimal() {
        let yaml = r#"
dataset:
  name: orders
  path: orders.parquet
"#;

        let suite = parse_yaml(yaml).expect("Failed to parse valid YAML");

        assert_eq!(suite.dataset.name, "orders");
        assert_eq!(suite.dataset.format, DataFormat::Parquet);
        assert!(!suite.fail_fast);
        assert!(suite.rules.is_empty());
        assert!(suite.references.is_empty());
        assert!(suite.logger.enabled);
        assert_eq!(suite.logger.path, PathBuf::from("aqualisys_runs.db"));
    }

    #[test]
    fn test_parse_yaml_with_rules_and_selectors() {
        let yaml = r#"
dataset:
  name: orders
  path: orders.csv
  format: csv
references:
  customers:
    path: customers.csv
    format: csv
fail_fast: true
logger:
  path: runs.db
selectors:
  include_tags: [Integrity]
  exclude_tags: [SLOW]
severity_overrides:
  "UniqueRule::order_id": warn
rules:
  - type: not_null
    column: order_id
    tags: [critical]
  - type: accepted_values
    column: status
    values: [pending, shipped]
    description: Status must be known
  - type: relationship
    column: customer_id
    reference:
      dataset: customers
      column: id
  - type: expression
    expression: total >= 0
    severity: warn
"#;

        let suite = parse_yaml(yaml).expect("Failed to parse YAML with rules");

        assert!(suite.fail_fast);
        assert_eq!(suite.references["customers"].format, DataFormat::Csv);
        assert_eq!(suite.selectors.include_tags, vec!["integrity"]);
        assert_eq!(suite.selectors.exclude_tags, vec!["slow"]);
        assert_eq!(
            suite.severity_overrides.get("UniqueRule::order_id"),
            Some(&Severity::Warn)
        );

        assert_eq!(suite.rules.len(), 4);
        assert_eq!(suite.rules[0].tags, vec!["critical"]);
        assert_eq!(
            suite.rules[1].param("values"),
            Some(&serde_json::json!(["pending", "shipped"]))
        );
        assert_eq!(
            suite.rules[1].description.as_deref(),
            Some("Status must be known")
        );
        assert_eq!(
            suite.rules[2].param("reference"),
            Some(&serde_json::json!({ "dataset": "customers", "column": "id" }))
        );
        assert_eq!(suite.rules[3].severity, Some(Severity::Warn));
        assert_eq!(
            suite.rules[3].require_str("expression").unwrap(),
            "total >= 0"
        );
    }

    #[test]
    fn test_parse_yaml_invalid_severity() {
        let yaml = r#"
dataset:
  name: orders
  path: orders.csv
rules:
  - type: unique
    column: order_id
    severity: critical
"#;

        let result = parse_yaml(yaml);
        assert!(matches!(result.unwrap_err(), ParserError::YamlError(_)));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let invalid_yaml = r#"
dataset:
  name: orders
  missing required fields
"#;

        let result = parse_yaml(invalid_yaml);
        assert!(matches!(result.unwrap_err(), ParserError::YamlError(_)));
    }

    #[test]
    fn test_parse_yaml_missing_dataset() {
        let yaml = r#"
rules:
  - type: not_null
    column: id
"#;

        assert!(parse_yaml(yaml).is_err());
    }

    #[test]
    fn test_parse_yaml_empty_dataset_name() {
        let yaml = r#"
dataset:
  name: "  "
  path: orders.csv
"#;

        let result = parse_yaml(yaml);
        assert!(matches!(result.unwrap_err(), ParserError::InvalidSuite(_)));
    }

    #[test]
    fn test_parse_yaml_empty_rule_type() {
        let yaml = r#"
dataset:
  name: orders
  path: orders.csv
rules:
  - type: ""
    column: id
"#;

        let err = parse_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("rule #1"));
    }

    #[test]
    fn test_parse_valid_toml() {
        let toml = r#"
fail_fast = false

[dataset]
name = "orders"
path = "orders.csv"
format = "csv"

[severity_overrides]
"NotNullRule::order_id" = "warn"

[[rules]]
type = "not_null"
column = "order_id"

[[rules]]
type = "accepted_values"
column = "status"
values = ["pending", "shipped"]
tags = ["categorical"]
"#;

        let suite = parse_toml(toml).expect("Failed to parse valid TOML");

        assert_eq!(suite.dataset.format, DataFormat::Csv);
        assert_eq!(suite.rules.len(), 2);
        assert_eq!(suite.rules[1].tags, vec!["categorical"]);
        assert_eq!(
            suite.severity_overrides.get("NotNullRule::order_id"),
            Some(&Severity::Warn)
        );
    }

    #[test]
    fn test_parse_invalid_toml() {
        let invalid_toml = r#"
[dataset]
name = "orders"
[[[invalid syntax
"#;

        let result = parse_toml(invalid_toml);
        assert!(matches!(result.unwrap_err(), ParserError::TomlError(_)));
    }

    #[test]
    fn test_detect_format_yaml() {
        assert_eq!(
            detect_format(Path::new("suite.yaml")).unwrap(),
            SuiteFormat::Yaml
        );
        assert_eq!(
            detect_format(Path::new("suite.YML")).unwrap(),
            SuiteFormat::Yaml
        );
    }

    #[test]
    fn test_detect_format_toml() {
        assert_eq!(
            detect_format(Path::new("suite.toml")).unwrap(),
            SuiteFormat::Toml
        );
    }

    #[test]
    fn test_detect_format_unsupported() {
        let result = detect_format(Path::new("suite.json"));
        assert!(matches!(
            result.unwrap_err(),
            ParserError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn test_detect_format_no_extension() {
        let result = detect_format(Path::new("suite"));
        assert!(matches!(result.unwrap_err(), ParserError::InvalidExtension));
    }

    #[test]
    fn test_parse_file_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.yml");
        std::fs::write(
            &path,
            r#"
dataset:
  name: orders
  path: data/orders.csv
  format: csv
logger:
  path: runs.db
"#,
        )
        .unwrap();

        let suite = parse_file(&path).expect("Failed to parse suite file");

        assert_eq!(suite.dataset.path, dir.path().join("data/orders.csv"));
        assert_eq!(suite.logger.path, dir.path().join("runs.db"));
    }

    #[test]
    fn test_parse_file_missing() {
        let result = parse_file(Path::new("/definitely/not/here.yml"));
        assert!(matches!(result.unwrap_err(), ParserError::IoError(_)));
    }
}
