//! Builder pattern for creating rule specifications.
//!
//! This module provides an ergonomic builder for constructing [`RuleSpec`]
//! values in code, mirroring what a suite file would declare.

use crate::{RuleSpec, Severity};
use serde_json::Value as JsonValue;

/// Builder for creating a `RuleSpec`.
///
/// # Example
///
/// ```rust
/// use aqualisys_core::{RuleSpecBuilder, Severity};
///
/// let spec = RuleSpecBuilder::new("accepted_values")
///     .column("status")
///     .param("values", serde_json::json!(["pending", "shipped"]))
///     .severity(Severity::Warn)
///     .tag("categorical")
///     .build();
///
/// assert_eq!(spec.column.as_deref(), Some("status"));
/// assert_eq!(spec.severity, Some(Severity::Warn));
/// ```
#[derive(Debug)]
pub struct RuleSpecBuilder {
    spec: RuleSpec,
}

impl RuleSpecBuilder {
    /// Creates a new builder for the given registry type.
    pub fn new(rule_type: impl Into<String>) -> Self {
        Self {
            spec: RuleSpec::new(rule_type),
        }
    }

    /// Sets the instance name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.spec.name = Some(name.into());
        self
    }

    /// Sets the target column.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.spec.column = Some(column.into());
        self
    }

    /// Sets the severity.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.spec.severity = Some(severity);
        self
    }

    /// Adds a tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.spec.tags.push(tag.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = Some(description.into());
        self
    }

    /// Sets a rule-specific parameter.
    pub fn param(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.spec.parameters.insert(key.into(), value);
        self
    }

    /// Builds the spec.
    pub fn build(self) -> RuleSpec {
        self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_matches_deserialized_spec() {
        let built = RuleSpecBuilder::new("relationship")
            .column("customer_id")
            .param(
                "reference",
                serde_json::json!({ "dataset": "customers", "column": "id" }),
            )
            .tag("integrity")
            .build();

        let parsed: RuleSpec = serde_json::from_value(serde_json::json!({
            "type": "relationship",
            "column": "customer_id",
            "reference": { "dataset": "customers", "column": "id" },
            "tags": ["integrity"],
        }))
        .unwrap();

        assert_eq!(built, parsed);
    }

    #[test]
    fn test_builder_defaults() {
        let spec = RuleSpecBuilder::new("not_null").build();
        assert_eq!(spec.name, None);
        assert_eq!(spec.severity, None);
        assert!(spec.tags.is_empty());
        assert!(spec.parameters.is_empty());
    }
}
