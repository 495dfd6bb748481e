//! Error types for the expression engine and file loading.

use aqualisys_core::{EvaluationError, QualityError};
use datafusion::error::DataFusionError;
use thiserror::Error;

/// Errors raised while talking to DataFusion.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Query planning or execution failed
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] DataFusionError),

    /// Building an Arrow batch failed
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// The private runtime could not be started
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// A query returned something other than the expected counters
    #[error("Unexpected query result: {0}")]
    UnexpectedResult(String),

    /// Reading a data file failed before DataFusion saw it
    #[error("Failed to read '{path}': {message}")]
    Load {
        /// File path
        path: String,
        /// What went wrong
        message: String,
    },

    /// Arrow value conversion failed
    #[error("Type conversion error: {0}")]
    TypeConversion(String),
}

impl EngineError {
    /// Creates a new runtime error.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }

    /// Creates a new unexpected-result error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResult(message.into())
    }

    /// Creates a new type conversion error.
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion(message.into())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Runtime(err.to_string())
    }
}

impl From<EngineError> for EvaluationError {
    fn from(err: EngineError) -> Self {
        EvaluationError::engine(err.to_string())
    }
}

impl From<EngineError> for QualityError {
    fn from(err: EngineError) -> Self {
        QualityError::Evaluation(err.into())
    }
}
