//! Error types for data-quality runs.
//!
//! Configuration-time problems (bad rule parameters, unknown rule types,
//! selector mistakes) are reported through [`QualityError`] before any rule is
//! evaluated. Problems evaluating a single rule against real data are reported
//! through [`EvaluationError`], which the checker turns into a failing outcome.

use thiserror::Error;

/// Result type for data-quality operations.
pub type Result<T> = std::result::Result<T, QualityError>;

/// Main error type for data-quality operations.
#[derive(Error, Debug)]
pub enum QualityError {
    /// Rule parameters are missing or have the wrong shape
    #[error("Invalid configuration for rule '{rule_type}': {message}")]
    RuleConfiguration {
        /// Rule type being configured
        rule_type: String,
        /// What is wrong with the parameters
        message: String,
    },

    /// Registry lookup for an unknown rule type
    #[error("Unknown rule type '{name}' (known types: {})", known.join(", "))]
    RuleTypeNotFound {
        /// Requested type name
        name: String,
        /// Type names the registry knows about
        known: Vec<String>,
    },

    /// Registering a type name twice without asking for replacement
    #[error("Rule type '{0}' is already registered")]
    DuplicateRuleType(String),

    /// Two rules in one rule set share an id
    #[error("Duplicate rule id '{0}' in rule set")]
    DuplicateRuleId(String),

    /// Severity override that matches no selected rule
    #[error("Severity override '{key}' does not match any selected rule")]
    UnknownOverride {
        /// Override key as given
        key: String,
    },

    /// Severity override that matches more than one selected rule
    #[error("Severity override '{key}' is ambiguous: it matches {count} rules")]
    AmbiguousOverride {
        /// Override key as given
        key: String,
        /// Number of rules sharing the key
        count: usize,
    },

    /// Severity string that is neither `error` nor `warn`
    #[error("Invalid severity '{0}': expected 'error' or 'warn'")]
    InvalidSeverity(String),

    /// A rule could not be evaluated against the dataset
    #[error("Rule evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    /// Persisting a run failed
    #[error("Logging backend error: {0}")]
    LoggingBackend(String),
}

impl QualityError {
    /// Creates a new rule configuration error.
    pub fn rule_config(rule_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleConfiguration {
            rule_type: rule_type.into(),
            message: message.into(),
        }
    }

    /// Creates a new logging backend error.
    pub fn logging(message: impl Into<String>) -> Self {
        Self::LoggingBackend(message.into())
    }

    /// Returns true for errors that indicate a broken setup rather than a data problem.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::Evaluation(_) | Self::LoggingBackend(_))
    }
}

/// Runtime failure while evaluating one rule.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// The rule targets a column the dataset does not have
    #[error("Column '{0}' not found in dataset")]
    MissingColumn(String),

    /// The reference dataset lacks the column a relationship rule joins on
    #[error("Column '{column}' not found in reference dataset '{dataset}'")]
    MissingReferenceColumn {
        /// Reference dataset name
        dataset: String,
        /// Missing column
        column: String,
    },

    /// The expression engine rejected or failed to run a query
    #[error("Expression engine error: {0}")]
    Engine(String),
}

impl EvaluationError {
    /// Creates a new engine error.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }
}
