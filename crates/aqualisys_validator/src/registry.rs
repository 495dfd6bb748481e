//! Rule registry: maps declarative type names to rule factories.
//!
//! A registry is a plain value. [`RuleRegistry::new`] starts empty and
//! [`RuleRegistry::with_builtin_rules`] seeds the five built-in types:
//!
//! | type              | rule                   | default tags              |
//! |-------------------|------------------------|---------------------------|
//! | `not_null`        | [`NotNullRule`]        | `nulls`, `integrity`      |
//! | `unique`          | [`UniqueRule`]         | `uniqueness`, `integrity` |
//! | `accepted_values` | [`AcceptedValuesRule`] | `reference`, `categorical`|
//! | `relationship`    | [`RelationshipRule`]   | `reference`, `integrity`  |
//! | `expression`      | [`ExpressionRule`]     | `expression`, `flexible`  |

use crate::{AcceptedValuesRule, ExpressionRule, NotNullRule, RelationshipRule, UniqueRule};
use aqualisys_core::{DataSet, DataValue, QualityError, Result, Rule, RuleMeta, RuleSpec, Severity};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Datasets a rule may need besides the one under validation.
///
/// # Example
///
/// ```rust
/// use aqualisys_core::DataSet;
/// use aqualisys_validator::BuildContext;
///
/// let context = BuildContext::new()
///     .with_reference("customers", DataSet::from_columns([("id", vec![1_i64, 2])]));
/// assert!(context.reference("customers").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    references: HashMap<String, Arc<DataSet>>,
}

impl BuildContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named reference dataset.
    pub fn with_reference(
        mut self,
        name: impl Into<String>,
        dataset: impl Into<Arc<DataSet>>,
    ) -> Self {
        self.references.insert(name.into(), dataset.into());
        self
    }

    /// Returns a reference dataset handle.
    pub fn reference(&self, name: &str) -> Option<Arc<DataSet>> {
        self.references.get(name).cloned()
    }

    /// Names of all reference datasets, sorted.
    pub fn reference_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.references.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Common attributes applied to every rule a factory builds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSettings {
    /// Instance name
    pub name: Option<String>,
    /// Configured severity
    pub severity: Severity,
    /// Definition tags merged with the spec's tags
    pub tags: BTreeSet<String>,
    /// Description
    pub description: Option<String>,
}

impl RuleSettings {
    /// Applies the settings to rule metadata.
    pub fn apply(&self, meta: RuleMeta) -> RuleMeta {
        let mut meta = meta.with_severity(self.severity).with_tags(&self.tags);
        if let Some(name) = &self.name {
            meta = meta.with_name(name.clone());
        }
        if let Some(description) = &self.description {
            meta = meta.with_description(description.clone());
        }
        meta
    }
}

/// Builds a rule from its declarative spec.
///
/// Factories must apply the given [`RuleSettings`] to the rule they return.
pub type RuleFactory =
    Arc<dyn Fn(&RuleSpec, &BuildContext, &RuleSettings) -> Result<Box<dyn Rule>> + Send + Sync>;

/// A registered rule type.
#[derive(Clone)]
pub struct RuleDefinition {
    name: String,
    description: String,
    tags: BTreeSet<String>,
    factory: RuleFactory,
}

impl RuleDefinition {
    /// Creates a definition.
    ///
    /// # Example
    ///
    /// ```rust
    /// use aqualisys_validator::{NotNullRule, RuleDefinition};
    ///
    /// let definition = RuleDefinition::new(
    ///     "present",
    ///     "Column must not contain nulls",
    ///     ["nulls"],
    ///     |spec, _ctx, settings| {
    ///         let rule = NotNullRule::new(spec.require_column()?)?.with_settings(settings);
    ///         Ok(Box::new(rule))
    ///     },
    /// );
    /// assert_eq!(definition.name(), "present");
    /// ```
    pub fn new<I, S, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        tags: I,
        factory: F,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&RuleSpec, &BuildContext, &RuleSettings) -> Result<Box<dyn Rule>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            tags: tags
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .collect(),
            factory: Arc::new(factory),
        }
    }

    /// Registry key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Default tags of rules built from this definition.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }
}

impl fmt::Debug for RuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Registry of rule types, keyed by case-insensitive name.
///
/// # Example
///
/// ```rust
/// use aqualisys_core::RuleSpecBuilder;
/// use aqualisys_validator::{BuildContext, RuleRegistry};
///
/// let registry = RuleRegistry::with_builtin_rules();
/// let spec = RuleSpecBuilder::new("unique").column("order_id").build();
///
/// let rule = registry.create("unique", &spec, &BuildContext::new()).unwrap();
/// assert_eq!(rule.id(), "UniqueRule::order_id");
/// assert!(rule.meta().tags().contains("uniqueness"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    definitions: BTreeMap<String, RuleDefinition>,
}

impl RuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded with the built-in rule types.
    pub fn with_builtin_rules() -> Self {
        let mut registry = Self::new();
        for definition in builtin_definitions() {
            registry.definitions.insert(key(definition.name()), definition);
        }
        registry
    }

    /// Registers a new type.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateRuleType` if the name is taken; use
    /// [`replace`](Self::replace) to override an existing type.
    pub fn register(&mut self, definition: RuleDefinition) -> Result<()> {
        let key = key(definition.name());
        if self.definitions.contains_key(&key) {
            return Err(QualityError::DuplicateRuleType(definition.name().to_string()));
        }
        debug!(rule_type = definition.name(), "Registered rule type");
        self.definitions.insert(key, definition);
        Ok(())
    }

    /// Registers a type, returning the definition it replaced.
    pub fn replace(&mut self, definition: RuleDefinition) -> Option<RuleDefinition> {
        debug!(rule_type = definition.name(), "Replacing rule type");
        self.definitions.insert(key(definition.name()), definition)
    }

    /// Looks up a definition.
    pub fn get(&self, name: &str) -> Option<&RuleDefinition> {
        self.definitions.get(&key(name))
    }

    /// Registered type names, sorted.
    pub fn known_types(&self) -> Vec<String> {
        self.definitions.values().map(|d| d.name.clone()).collect()
    }

    /// Definitions sorted by name, optionally restricted to one tag.
    pub fn list(&self, tag: Option<&str>) -> Vec<&RuleDefinition> {
        let tag = tag.map(|t| t.trim().to_lowercase());
        self.definitions
            .values()
            .filter(|d| tag.as_ref().is_none_or(|t| d.tags.contains(t)))
            .collect()
    }

    /// Definitions whose default tags intersect `tags`, sorted by name.
    pub fn resolve_by_tag<I, S>(&self, tags: I) -> Vec<&RuleDefinition>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: BTreeSet<String> = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .collect();
        self.definitions
            .values()
            .filter(|d| !d.tags.is_disjoint(&wanted))
            .collect()
    }

    /// Builds one rule of type `type_name` from `spec`.
    ///
    /// # Errors
    ///
    /// Returns `RuleTypeNotFound` for an unknown type and `RuleConfiguration`
    /// when the spec's parameters do not fit the type.
    pub fn create(
        &self,
        type_name: &str,
        spec: &RuleSpec,
        context: &BuildContext,
    ) -> Result<Box<dyn Rule>> {
        let definition = self
            .get(type_name)
            .ok_or_else(|| QualityError::RuleTypeNotFound {
                name: type_name.to_string(),
                known: self.known_types(),
            })?;

        let mut tags = definition.tags.clone();
        tags.extend(spec.tags.iter().map(|t| t.trim().to_lowercase()));
        let settings = RuleSettings {
            name: spec.name.clone(),
            severity: spec.severity.unwrap_or_default(),
            tags,
            description: spec.description.clone(),
        };

        let rule = (definition.factory)(spec, context, &settings)?;
        debug!(rule_id = %rule.id(), rule_type = definition.name(), "Built rule");
        Ok(rule)
    }

    /// Builds every spec in order, using each spec's `type`.
    pub fn build_rules(
        &self,
        specs: &[RuleSpec],
        context: &BuildContext,
    ) -> Result<Vec<Arc<dyn Rule>>> {
        specs
            .iter()
            .map(|spec| self.create(&spec.rule_type, spec, context).map(Arc::from))
            .collect()
    }
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn builtin_definitions() -> Vec<RuleDefinition> {
    vec![
        RuleDefinition::new(
            "not_null",
            "Column must not contain null values",
            ["nulls", "integrity"],
            |spec, _ctx, settings| {
                let rule = NotNullRule::new(spec.require_column()?)?.with_settings(settings);
                Ok(Box::new(rule))
            },
        ),
        RuleDefinition::new(
            "unique",
            "Column values must be unique",
            ["uniqueness", "integrity"],
            |spec, _ctx, settings| {
                let rule = UniqueRule::new(spec.require_column()?)?.with_settings(settings);
                Ok(Box::new(rule))
            },
        ),
        RuleDefinition::new(
            "accepted_values",
            "Column values must belong to an allowed set",
            ["reference", "categorical"],
            |spec, _ctx, settings| {
                let values = accepted_values(spec)?;
                let rule = AcceptedValuesRule::new(spec.require_column()?, values)?
                    .with_settings(settings);
                Ok(Box::new(rule))
            },
        ),
        RuleDefinition::new(
            "relationship",
            "Column values must exist in a reference dataset column",
            ["reference", "integrity"],
            |spec, ctx, settings| {
                let (dataset, column) = reference_target(spec)?;
                let reference = ctx.reference(&dataset).ok_or_else(|| {
                    QualityError::rule_config(
                        &spec.rule_type,
                        format!(
                            "unknown reference dataset '{}' (available: {})",
                            dataset,
                            ctx.reference_names().join(", ")
                        ),
                    )
                })?;
                let rule = RelationshipRule::new(spec.require_column()?, dataset, column, reference)?
                    .with_settings(settings);
                Ok(Box::new(rule))
            },
        ),
        RuleDefinition::new(
            "expression",
            "SQL boolean expression must hold for every row",
            ["expression", "flexible"],
            |spec, _ctx, settings| {
                let rule = ExpressionRule::new(spec.require_str("expression")?)?
                    .with_settings(settings);
                Ok(Box::new(rule))
            },
        ),
    ]
}

/// Reads `values` (or `allowed_values`) as a list of data values.
fn accepted_values(spec: &RuleSpec) -> Result<Vec<DataValue>> {
    match spec.param_any(&["values", "allowed_values"]) {
        Some((_, JsonValue::Array(items))) => Ok(items.iter().map(DataValue::from_json).collect()),
        Some((key, other)) => Err(QualityError::rule_config(
            &spec.rule_type,
            format!("parameter '{}' must be a list, got {}", key, other),
        )),
        None => Err(QualityError::rule_config(
            &spec.rule_type,
            "missing required parameter 'values'",
        )),
    }
}

/// Reads `reference: {dataset, column}`.
fn reference_target(spec: &RuleSpec) -> Result<(String, String)> {
    let reference = spec
        .param("reference")
        .and_then(JsonValue::as_object)
        .ok_or_else(|| {
            QualityError::rule_config(
                &spec.rule_type,
                "parameter 'reference' must be a mapping with 'dataset' and 'column'",
            )
        })?;

    let field = |name: &str| {
        reference
            .get(name)
            .and_then(JsonValue::as_str)
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                QualityError::rule_config(
                    &spec.rule_type,
                    format!("parameter 'reference.{}' must be a non-empty string", name),
                )
            })
    };

    Ok((field("dataset")?, field("column")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqualisys_core::RuleSpecBuilder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_builtin_types() {
        let registry = RuleRegistry::with_builtin_rules();
        assert_eq!(
            registry.known_types(),
            vec!["accepted_values", "expression", "not_null", "relationship", "unique"]
        );
        assert!(RuleRegistry::new().known_types().is_empty());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = RuleRegistry::with_builtin_rules();
        assert_eq!(registry.get("NOT_NULL").unwrap().name(), "not_null");
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = RuleRegistry::with_builtin_rules();
        let definition = registry.get("unique").unwrap().clone();

        let err = registry.register(definition.clone()).unwrap_err();
        assert!(matches!(err, QualityError::DuplicateRuleType(_)));

        assert!(registry.replace(definition).is_some());
        assert_eq!(registry.known_types().len(), 5);
    }

    #[test]
    fn test_unknown_type_lists_known_types() {
        let registry = RuleRegistry::with_builtin_rules();
        let spec = RuleSpecBuilder::new("does_not_exist").column("id").build();

        let err = registry
            .create("does_not_exist", &spec, &BuildContext::new())
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("does_not_exist"));
        assert!(message.contains("not_null"));
    }

    #[test]
    fn test_list_by_tag() {
        let registry = RuleRegistry::with_builtin_rules();
        let names: Vec<&str> = registry
            .list(Some("Integrity"))
            .into_iter()
            .map(RuleDefinition::name)
            .collect();
        assert_eq!(names, vec!["not_null", "relationship", "unique"]);
        assert_eq!(registry.list(None).len(), 5);
    }

    #[test]
    fn test_resolve_by_tag() {
        let registry = RuleRegistry::with_builtin_rules();
        let names: Vec<&str> = registry
            .resolve_by_tag(["categorical", "flexible"])
            .into_iter()
            .map(RuleDefinition::name)
            .collect();
        assert_eq!(names, vec!["accepted_values", "expression"]);
        assert!(registry.resolve_by_tag(["nothing"]).is_empty());
    }

    #[test]
    fn test_create_applies_common_settings() {
        let registry = RuleRegistry::with_builtin_rules();
        let spec = RuleSpecBuilder::new("not_null")
            .column("order_id")
            .severity(Severity::Warn)
            .tag("Critical")
            .description("Orders need ids")
            .build();

        let rule = registry.create("not_null", &spec, &BuildContext::new()).unwrap();
        let meta = rule.meta();

        assert_eq!(meta.severity(), Severity::Warn);
        assert_eq!(meta.description(), "Orders need ids");
        let tags: Vec<&str> = meta.tags().iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["critical", "integrity", "nulls"]);
    }

    #[test]
    fn test_accepted_values_alias_and_errors() {
        let registry = RuleRegistry::with_builtin_rules();
        let context = BuildContext::new();

        let alias = RuleSpecBuilder::new("accepted_values")
            .column("status")
            .param("allowed_values", json!(["a", "b"]))
            .build();
        assert!(registry.create("accepted_values", &alias, &context).is_ok());

        let missing = RuleSpecBuilder::new("accepted_values").column("status").build();
        assert!(registry.create("accepted_values", &missing, &context).is_err());

        let empty = RuleSpecBuilder::new("accepted_values")
            .column("status")
            .param("values", json!([]))
            .build();
        let err = registry.create("accepted_values", &empty, &context).unwrap_err();
        assert!(err.is_configuration_error());

        let scalar = RuleSpecBuilder::new("accepted_values")
            .column("status")
            .param("values", json!("a"))
            .build();
        assert!(registry.create("accepted_values", &scalar, &context).is_err());
    }

    #[test]
    fn test_relationship_needs_known_reference() {
        let registry = RuleRegistry::with_builtin_rules();
        let spec = RuleSpecBuilder::new("relationship")
            .column("customer_id")
            .param("reference", json!({ "dataset": "customers", "column": "id" }))
            .build();

        let err = registry
            .create("relationship", &spec, &BuildContext::new())
            .unwrap_err();
        assert!(err.to_string().contains("unknown reference dataset 'customers'"));

        let context = BuildContext::new()
            .with_reference("customers", DataSet::from_columns([("id", vec![1_i64])]));
        let rule = registry.create("relationship", &spec, &context).unwrap();
        assert_eq!(rule.id(), "RelationshipRule::customer_id");
    }

    #[test]
    fn test_missing_column_parameter() {
        let registry = RuleRegistry::with_builtin_rules();
        let spec = RuleSpecBuilder::new("unique").build();
        let err = registry.create("unique", &spec, &BuildContext::new()).unwrap_err();
        assert!(matches!(err, QualityError::RuleConfiguration { .. }));
    }

    #[test]
    fn test_build_rules_keeps_order() {
        let registry = RuleRegistry::with_builtin_rules();
        let specs = vec![
            RuleSpecBuilder::new("unique").column("b").build(),
            RuleSpecBuilder::new("not_null").column("a").build(),
            RuleSpecBuilder::new("expression")
                .param("expression", json!("a > 0"))
                .name("positive_a")
                .build(),
        ];

        let rules = registry.build_rules(&specs, &BuildContext::new()).unwrap();
        let ids: Vec<String> = rules.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["UniqueRule::b", "NotNullRule::a", "positive_a"]);
    }

    #[test]
    fn test_custom_definition() {
        let mut registry = RuleRegistry::new();
        registry
            .register(RuleDefinition::new(
                "Present",
                "Custom not-null",
                ["custom"],
                |spec, _ctx, settings| {
                    Ok(Box::new(
                        NotNullRule::new(spec.require_column()?)?.with_settings(settings),
                    ))
                },
            ))
            .unwrap();

        let spec = RuleSpecBuilder::new("present").column("id").build();
        let rule = registry.create("present", &spec, &BuildContext::new()).unwrap();
        assert!(rule.meta().tags().contains("custom"));
    }
}
