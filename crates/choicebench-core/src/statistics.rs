//! Per-model accuracy and aggregate statistics.
//!
//! Accuracy is `correct / total * 100`. An empty question set is an error,
//! never a silent zero.

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::model::{ModelSummary, QuestionResult};
use crate::report::EvaluationReport;

/// Accuracy as a percentage.
pub fn accuracy(correct: u32, total: u32) -> Result<f64, EvalError> {
    if total == 0 {
        return Err(EvalError::EmptyQuestionSet);
    }
    Ok(correct as f64 / total as f64 * 100.0)
}

impl ModelSummary {
    /// Accuracy over the questions this model saw.
    pub fn accuracy(&self) -> Result<f64, EvalError> {
        accuracy(self.correct_count, self.total)
    }

    /// Results that were not counted as correct.
    pub fn wrong_answers(&self) -> impl Iterator<Item = &QuestionResult> {
        self.results.iter().filter(|r| !r.is_correct)
    }

    /// Number of pairs that exhausted their attempt budget.
    pub fn parsing_failures(&self) -> u32 {
        self.results.iter().filter(|r| r.parsing_failed).count() as u32
    }
}

/// Final score line for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub model: String,
    pub correct: u32,
    pub total: u32,
    /// Percentage in 0..=100.
    pub accuracy: f64,
    pub parsing_failures: u32,
}

/// Compute the score line for every model in a report, in name order.
pub fn summarize(report: &EvaluationReport) -> Result<Vec<ModelScore>, EvalError> {
    report
        .models
        .iter()
        .map(|(model, summary)| {
            Ok(ModelScore {
                model: model.clone(),
                correct: summary.correct_count,
                total: summary.total,
                accuracy: summary.accuracy()?,
                parsing_failures: summary.parsing_failures(),
            })
        })
        .collect()
}
