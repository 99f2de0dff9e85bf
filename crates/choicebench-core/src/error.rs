//! Core error types.
//!
//! These cover malformed input and aggregation failures. Per-attempt backend
//! and parse failures are never surfaced here: they are recorded on the
//! attempt and the run continues.

use thiserror::Error;

use crate::model::Vendor;

/// Errors that abort an evaluation run.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    /// A question failed validation.
    #[error("invalid question {index}: {reason}")]
    InvalidQuestion { index: u32, reason: String },

    /// Two questions share the same index.
    #[error("duplicate question index: {0}")]
    DuplicateQuestion(u32),

    /// A model configuration failed validation.
    #[error("invalid model config '{name}': {reason}")]
    InvalidModelConfig { name: String, reason: String },

    /// Two model configurations share the same name.
    #[error("duplicate model name: {0}")]
    DuplicateModel(String),

    /// No models were configured.
    #[error("no models configured")]
    NoModels,

    /// Accuracy was requested over zero questions.
    #[error("cannot compute accuracy over an empty question set")]
    EmptyQuestionSet,

    /// A model names a vendor with no registered backend.
    #[error("no backend registered for vendor '{0}'")]
    BackendMissing(Vendor),
}

impl EvalError {
    /// Returns `true` if this error comes from malformed input data.
    pub fn is_input_validation(&self) -> bool {
        matches!(
            self,
            EvalError::InvalidQuestion { .. }
                | EvalError::DuplicateQuestion(_)
                | EvalError::InvalidModelConfig { .. }
                | EvalError::DuplicateModel(_)
                | EvalError::NoModels
        )
    }
}
