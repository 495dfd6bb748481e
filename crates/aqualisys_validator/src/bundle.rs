//! Named rule groups.
//!
//! A [`RuleBundle`] packages a reusable set of rules under a name, so a
//! standard set of checks can be added to many checkers at once.

use crate::{BuildContext, RuleRegistry};
use aqualisys_core::{Result, Rule, RuleSpec};
use std::sync::Arc;

/// A named, ordered group of rules.
///
/// # Example
///
/// ```rust
/// use aqualisys_core::Rule;
/// use aqualisys_validator::{NotNullRule, RuleBundle, UniqueRule};
/// use std::sync::Arc;
///
/// let keys = RuleBundle::new("primary_key", "order_id is present and unique")
///     .with_rule(Arc::new(NotNullRule::new("order_id").unwrap()))
///     .with_rule(Arc::new(UniqueRule::new("order_id").unwrap()));
///
/// assert_eq!(keys.rules().len(), 2);
/// assert_eq!(keys.rules()[1].id(), "UniqueRule::order_id");
/// ```
#[derive(Debug, Clone)]
pub struct RuleBundle {
    name: String,
    description: String,
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleBundle {
    /// Creates an empty bundle.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            rules: Vec::new(),
        }
    }

    /// Builds a bundle from declarative rule specs.
    pub fn from_specs(
        name: impl Into<String>,
        description: impl Into<String>,
        registry: &RuleRegistry,
        specs: &[RuleSpec],
        context: &BuildContext,
    ) -> Result<Self> {
        Ok(Self::new(name, description).with_rules(registry.build_rules(specs, context)?))
    }

    /// Appends a rule.
    pub fn with_rule(mut self, rule: Arc<dyn Rule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Appends several rules, keeping their order.
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = Arc<dyn Rule>>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The bundled rules, in order.
    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    pub(crate) fn into_rules(self) -> Vec<Arc<dyn Rule>> {
        self.rules
    }
}
