//! Question-set loading and input validation.
//!
//! Question sets are JSON: either a bare array of questions, or an object
//! holding the array under a named key. Validation failures abort a run
//! before any backend is called.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::error::EvalError;
use crate::model::{ModelConfig, Question, OPTION_COUNT};

/// Load a question set from a JSON file.
///
/// `key` names the field holding the questions when the file is an object.
/// Without a key, an object with exactly one array-valued field is accepted.
pub fn load_question_set(path: &Path, key: Option<&str>) -> Result<Vec<Question>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question file: {}", path.display()))?;

    parse_question_set_str(&content, key)
        .with_context(|| format!("failed to load questions from {}", path.display()))
}

/// Parse a question set from a JSON string (useful for testing).
pub fn parse_question_set_str(content: &str, key: Option<&str>) -> Result<Vec<Question>> {
    let value: Value = serde_json::from_str(content).context("invalid JSON")?;

    let questions = match (value, key) {
        (Value::Array(items), None) => Value::Array(items),
        (Value::Object(mut map), Some(key)) => map
            .remove(key)
            .ok_or_else(|| anyhow::anyhow!("missing required key '{key}'"))?,
        (Value::Object(map), None) => {
            let mut arrays = map.into_iter().filter(|(_, v)| v.is_array());
            match (arrays.next(), arrays.next()) {
                (Some((_, v)), None) => v,
                (None, _) => anyhow::bail!("no question array found"),
                (Some(_), Some(_)) => {
                    anyhow::bail!("several arrays found; pass the key holding the questions")
                }
            }
        }
        (Value::Array(_), Some(key)) => {
            anyhow::bail!("expected an object with key '{key}', found an array")
        }
        _ => anyhow::bail!("expected a question array or an object holding one"),
    };

    serde_json::from_value(questions).context("malformed question record")
}

/// Validate a single question.
pub fn validate_question(question: &Question) -> Result<(), EvalError> {
    let invalid = |reason: String| EvalError::InvalidQuestion {
        index: question.index,
        reason,
    };

    if question.content.trim().is_empty() {
        return Err(invalid("question content is empty".into()));
    }
    if question.options.len() != OPTION_COUNT {
        return Err(invalid(format!(
            "expected {OPTION_COUNT} options, found {}",
            question.options.len()
        )));
    }

    let mut seen = HashSet::new();
    for option in &question.options {
        if !(1..=OPTION_COUNT as u8).contains(&option.option_index) {
            return Err(invalid(format!(
                "option index {} is outside 1..={OPTION_COUNT}",
                option.option_index
            )));
        }
        if !seen.insert(option.option_index) {
            return Err(invalid(format!(
                "duplicate option index {}",
                option.option_index
            )));
        }
    }

    if !seen.contains(&question.correct_option_index) {
        return Err(invalid(format!(
            "correct option index {} does not reference an option",
            question.correct_option_index
        )));
    }

    Ok(())
}

/// Validate every question and check that indices are unique.
pub fn validate_question_set(questions: &[Question]) -> Result<(), EvalError> {
    let mut seen = HashSet::new();
    for question in questions {
        validate_question(question)?;
        if !seen.insert(question.index) {
            return Err(EvalError::DuplicateQuestion(question.index));
        }
    }
    Ok(())
}

/// Validate the model line-up.
pub fn validate_models(models: &[ModelConfig]) -> Result<(), EvalError> {
    if models.is_empty() {
        return Err(EvalError::NoModels);
    }

    let mut seen = HashSet::new();
    for model in models {
        if model.name.trim().is_empty() {
            return Err(EvalError::InvalidModelConfig {
                name: model.name.clone(),
                reason: "name is empty".into(),
            });
        }
        if let Some(t) = model.parameters.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(EvalError::InvalidModelConfig {
                    name: model.name.clone(),
                    reason: format!("temperature {t} is outside 0.0..=2.0"),
                });
            }
        }
        if !seen.insert(model.name.as_str()) {
            return Err(EvalError::DuplicateModel(model.name.clone()));
        }
    }
    Ok(())
}
