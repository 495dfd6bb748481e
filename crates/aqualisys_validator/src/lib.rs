//! # Aqualisys Validator
//!
//! Rule implementations and run orchestration for the Aqualisys data-quality
//! engine. This crate provides:
//!
//! - Built-in rules (not-null, unique, accepted values, relationship, SQL expression)
//! - The [`RuleRegistry`] mapping declarative rule types to factories
//! - The [`DataQualityChecker`] running a rule set against a dataset
//! - [`RuleBundle`] for packaging reusable groups of rules
//! - DataFusion-backed file loading for CSV, Parquet and JSON datasets
//!
//! ## Example
//!
//! ```rust
//! use aqualisys_core::{DataSet, RuleSpecBuilder, RunOptions};
//! use aqualisys_validator::{BuildContext, DataQualityChecker, RuleRegistry};
//!
//! let registry = RuleRegistry::with_builtin_rules();
//! let specs = vec![
//!     RuleSpecBuilder::new("not_null").column("order_id").build(),
//!     RuleSpecBuilder::new("accepted_values")
//!         .column("status")
//!         .param("values", serde_json::json!(["pending", "shipped"]))
//!         .build(),
//! ];
//! let checker = DataQualityChecker::from_specs(&registry, &specs, &BuildContext::new()).unwrap();
//!
//! let dataset = DataSet::from_columns([
//!     ("order_id", vec![Some("a"), Some("b"), Some("c")]),
//!     ("status", vec![Some("pending"), Some("shipped"), Some("cancelled")]),
//! ]);
//! let result = checker.run(&dataset, "orders", &RunOptions::new()).unwrap();
//!
//! if result.passed() {
//!     println!("Run passed!");
//! } else {
//!     for outcome in result.report.failed_outcomes() {
//!         println!("{}: {}", outcome.rule_id, outcome.message);
//!     }
//! }
//! ```

/// Adds builder methods forwarding to a rule's `meta` field.
macro_rules! impl_meta_builders {
    ($rule:ty) => {
        impl $rule {
            /// Sets an explicit instance name, which becomes the rule id.
            pub fn with_name(mut self, name: impl Into<String>) -> Self {
                self.meta = self.meta.with_name(name);
                self
            }

            /// Sets the configured severity.
            pub fn with_severity(mut self, severity: ::aqualisys_core::Severity) -> Self {
                self.meta = self.meta.with_severity(severity);
                self
            }

            /// Adds selection tags.
            pub fn with_tags<I, S>(mut self, tags: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: AsRef<str>,
            {
                self.meta = self.meta.with_tags(tags);
                self
            }

            /// Sets the description.
            pub fn with_description(mut self, description: impl Into<String>) -> Self {
                self.meta = self.meta.with_description(description);
                self
            }

            /// Applies registry settings.
            pub fn with_settings(mut self, settings: &$crate::RuleSettings) -> Self {
                self.meta = settings.apply(self.meta);
                self
            }
        }
    };
}

mod bundle;
mod column;
mod convert;
mod engine;
mod error;
mod expression;
mod registry;
mod relationship;
mod selection;
mod session;

pub use bundle::*;
pub use column::*;
pub use convert::*;
pub use engine::*;
pub use error::*;
pub use expression::*;
pub use registry::*;
pub use relationship::*;
pub use selection::*;
pub use session::{DATASET_TABLE, load_dataset, read_dataset};
