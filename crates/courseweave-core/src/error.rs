//! Engine error types.
//!
//! Only failures that stop a run live here. Anomalies and bias flags are
//! result values, not errors.

use thiserror::Error;

use crate::validate::Violation;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The canonical dataset broke one or more schema or referential checks.
    #[error("data validation failed with {count} violation(s)")]
    Validation {
        count: usize,
        violations: Vec<Violation>,
    },

    /// The completion log could not be fetched.
    #[error("completion source '{source_name}' failed: {message}")]
    CompletionSource {
        source_name: String,
        message: String,
    },

    /// An analysis task panicked or was cancelled.
    #[error("analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl EngineError {
    /// The violations carried by a validation failure, if this is one.
    pub fn violations(&self) -> Option<&[Violation]> {
        match self {
            EngineError::Validation { violations, .. } => Some(violations),
            _ => None,
        }
    }
}

/// Errors from an individual fairness metric. Never escalated past the
/// analyzer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    /// There were no courses to evaluate.
    #[error("no courses to evaluate")]
    EmptyInput,

    /// The metric has no defined value for a group.
    #[error("metric undefined for group '{group}': {reason}")]
    Undefined { group: String, reason: String },
}
