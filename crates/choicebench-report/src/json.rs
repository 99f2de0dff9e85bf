//! JSON report writers.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use choicebench_core::model::{ModelSummary, Question};
use choicebench_core::report::EvaluationReport;

/// Header written at the top of every report file.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// UTC time as `YYYY-MM-DD HH:MM:SS`.
    pub evaluation_time: String,
    pub evaluator: String,
    #[serde(skip)]
    timestamp: DateTime<Utc>,
}

impl ReportMetadata {
    pub fn new(evaluator: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            evaluation_time: at.format("%Y-%m-%d %H:%M:%S").to_string(),
            evaluator: evaluator.into(),
            timestamp: at,
        }
    }

    /// Metadata for a finished report.
    pub fn for_report(report: &EvaluationReport, evaluator: impl Into<String>) -> Self {
        Self::new(evaluator, report.created_at)
    }

    /// File-name-safe form of the evaluation time.
    pub fn file_stamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d_%H-%M-%S").to_string()
    }

    fn with_model(&self, model: &str) -> Value {
        json!({
            "evaluation_time": self.evaluation_time,
            "evaluator": self.evaluator,
            "model_name": model,
        })
    }
}

const SUMMARY_STEM: &str = "evaluation_summary";

/// Where [`write_all`] put each report.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub results: PathBuf,
    pub wrong_answers: PathBuf,
    pub complete_results: PathBuf,
}

/// Turn a model name into a file-safe slug.
pub fn slug(model: &str) -> String {
    model
        .chars()
        .map(|c| match c {
            ':' | '/' | '\\' | ' ' => '-',
            c => c,
        })
        .collect()
}

/// Assign each model a distinct file stem.
///
/// Models whose slugs collide, with each other or with a `reserved` stem,
/// get a numeric suffix in name order: `a-b`, `a-b-2`, ...
fn file_stems<'a>(
    models: impl IntoIterator<Item = &'a String>,
    reserved: &[&str],
) -> HashMap<&'a str, String> {
    let mut taken: HashSet<String> = reserved.iter().map(|s| s.to_string()).collect();
    let mut stems = HashMap::new();
    for model in models {
        let base = slug(model);
        let mut stem = base.clone();
        let mut n = 2;
        while taken.contains(&stem) {
            stem = format!("{base}-{n}");
            n += 1;
        }
        taken.insert(stem.clone());
        stems.insert(model.as_str(), stem);
    }
    stems
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote report");
    Ok(())
}

fn index_questions(questions: &[Question]) -> HashMap<u32, &Question> {
    questions.iter().map(|q| (q.index, q)).collect()
}

/// The overall results document.
pub fn generate_results(report: &EvaluationReport, meta: &ReportMetadata) -> Value {
    json!({
        "metadata": meta,
        "results": report,
    })
}

/// Write `evaluation_results_<ts>.json` into `dir`.
pub fn write_results(report: &EvaluationReport, meta: &ReportMetadata, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(format!("evaluation_results_{}.json", meta.file_stamp()));
    write_json(&path, &generate_results(report, meta))?;
    Ok(path)
}

/// The wrong-answer document for one model.
///
/// Each entry is the original question plus what the model said.
pub fn generate_wrong_answers(
    model: &str,
    summary: &ModelSummary,
    questions: &[Question],
    meta: &ReportMetadata,
) -> Result<Value> {
    let by_index = index_questions(questions);
    let mut wrong = Vec::new();

    for result in summary.results.iter().filter(|r| !r.is_correct) {
        let Some(question) = by_index.get(&result.question_index) else {
            continue;
        };
        let mut entry = serde_json::to_value(question)?;
        if let Value::Object(map) = &mut entry {
            map.insert("model_answer".into(), json!(result.model_answer));
            map.insert("raw_responses".into(), json!(result.raw_responses()));
            map.insert("parsing_failed".into(), json!(result.parsing_failed));
        }
        wrong.push(entry);
    }

    Ok(json!({
        "metadata": meta.with_model(model),
        "wrong_questions": wrong,
    }))
}

/// Write one `wrong_answers_<ts>/<model>.json` per model; returns the directory.
pub fn write_wrong_answers(
    report: &EvaluationReport,
    questions: &[Question],
    meta: &ReportMetadata,
    dir: &Path,
) -> Result<PathBuf> {
    let out = dir.join(format!("wrong_answers_{}", meta.file_stamp()));
    std::fs::create_dir_all(&out)
        .with_context(|| format!("failed to create {}", out.display()))?;

    let stems = file_stems(report.models.keys(), &[]);
    for (model, summary) in &report.models {
        let doc = generate_wrong_answers(model, summary, questions, meta)?;
        write_json(&out.join(format!("{}.json", stems[model.as_str()])), &doc)?;
        tracing::info!(
            %model,
            wrong = summary.wrong_answers().count(),
            total = summary.total,
            "saved wrong answers"
        );
    }
    Ok(out)
}

/// Every answer of one model, sorted by question index.
pub fn generate_complete_answers(
    model: &str,
    summary: &ModelSummary,
    questions: &[Question],
    meta: &ReportMetadata,
) -> Result<Value> {
    let by_index = index_questions(questions);

    let mut answers: Vec<_> = summary
        .results
        .iter()
        .filter_map(|result| {
            by_index.get(&result.question_index).map(|question| (question, result))
        })
        .collect();
    answers.sort_by_key(|(question, _)| question.index);

    let answers: Vec<Value> = answers
        .into_iter()
        .map(|(question, result)| {
            json!({
                "question_index": question.index,
                "question_content": question.content,
                "options": question.options,
                "correct_answer": result.correct_answer,
                "model_answer": result.model_answer,
                "parsing_failed": result.parsing_failed,
                "raw_responses": result.raw_responses(),
            })
        })
        .collect();

    let accuracy = summary.accuracy()?;
    Ok(json!({
        "metadata": meta.with_model(model),
        "evaluation_results": {
            "total_questions": summary.total,
            "correct_answers": summary.correct_count,
            "accuracy": accuracy,
            "answers": answers,
        }
    }))
}

/// Per-model totals across the run.
pub fn generate_summary(report: &EvaluationReport, meta: &ReportMetadata) -> Result<Value> {
    let mut models = serde_json::Map::new();
    for (model, summary) in &report.models {
        let accuracy = summary.accuracy()?;
        models.insert(
            model.clone(),
            json!({
                "total_correct": summary.correct_count,
                "accuracy": accuracy,
            }),
        );
    }

    Ok(json!({
        "metadata": meta,
        "summary": {
            "total_questions": report.total_questions,
            "models_summary": models,
        }
    }))
}

/// Write `complete_results_<ts>/<model>.json` for every model plus
/// `evaluation_summary.json`; returns the directory.
pub fn write_complete_answers(
    report: &EvaluationReport,
    questions: &[Question],
    meta: &ReportMetadata,
    dir: &Path,
) -> Result<PathBuf> {
    let out = dir.join(format!("complete_results_{}", meta.file_stamp()));
    std::fs::create_dir_all(&out)
        .with_context(|| format!("failed to create {}", out.display()))?;

    let stems = file_stems(report.models.keys(), &[SUMMARY_STEM]);
    for (model, summary) in &report.models {
        let doc = generate_complete_answers(model, summary, questions, meta)?;
        write_json(&out.join(format!("{}.json", stems[model.as_str()])), &doc)?;
    }
    write_json(
        &out.join(format!("{SUMMARY_STEM}.json")),
        &generate_summary(report, meta)?,
    )?;
    Ok(out)
}

/// Write every report family into `dir`.
pub fn write_all(
    report: &EvaluationReport,
    questions: &[Question],
    meta: &ReportMetadata,
    dir: &Path,
) -> Result<ReportPaths> {
    Ok(ReportPaths {
        results: write_results(report, meta, dir)?,
        wrong_answers: write_wrong_answers(report, questions, meta, dir)?,
        complete_results: write_complete_answers(report, questions, meta, dir)?,
    })
}
