//! The evaluation report produced by one run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ModelSummary;

/// The result of a complete run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Unique run identifier.
    pub id: Uuid,
    /// When the run finished.
    pub created_at: DateTime<Utc>,
    /// Number of questions evaluated.
    pub total_questions: u32,
    /// Per-model summaries keyed by model name.
    pub models: BTreeMap<String, ModelSummary>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}
