//! The `choicebench run` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use choicebench_core::engine::{EvalEngine, ProgressReporter};
use choicebench_core::model::{AttemptRecord, ModelConfig, QuestionResult, Vendor};
use choicebench_core::parser;
use choicebench_core::report::EvaluationReport;
use choicebench_core::statistics::summarize;
use choicebench_providers::config::{load_config_from, BenchConfig};
use choicebench_providers::build_registry;
use choicebench_report::{write_all, ReportMetadata};

/// Arguments of `choicebench run`; `None` falls back to the config file.
pub struct RunArgs {
    pub questions: PathBuf,
    pub key: Option<String>,
    pub config: Option<PathBuf>,
    pub models: Option<String>,
    pub parallelism: Option<usize>,
    pub max_attempts: Option<u32>,
    pub output: Option<PathBuf>,
    pub evaluator: Option<String>,
}

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_attempt(&self, model: &str, question_index: u32, attempt: &AttemptRecord) {
        if attempt.parsed_answer.is_none() {
            eprintln!(
                "  Retry: {model} :: Q{question_index} attempt {} unparseable: {:?}",
                attempt.attempt_number, attempt.raw_text
            );
        }
    }

    fn on_pair_complete(&self, model: &str, result: &QuestionResult) {
        let status = if result.parsing_failed {
            "NO ANSWER"
        } else if result.is_correct {
            "OK"
        } else {
            "WRONG"
        };
        eprintln!(
            "  Done: {model} :: Q{} answered {} (expected {}) [{status}]",
            result.question_index, result.model_answer, result.correct_answer
        );
    }

    fn on_run_complete(&self, pairs: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {pairs} question/model pairs ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

/// Resolve `--models` against the configured line-up.
///
/// Each entry is a configured model name or an ad-hoc `vendor/model`.
fn select_models(config: &BenchConfig, filter: Option<&str>) -> Result<Vec<ModelConfig>> {
    let Some(filter) = filter else {
        return Ok(config.models.clone());
    };

    filter
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| -> Result<ModelConfig> {
            if let Some(model) = config.models.iter().find(|m| m.name == name) {
                return Ok(model.clone());
            }
            match name.split_once('/') {
                Some((vendor, model)) => {
                    let vendor: Vendor = vendor.parse().map_err(anyhow::Error::msg)?;
                    Ok(ModelConfig::new(model, vendor).with_temperature(0.0))
                }
                None => anyhow::bail!(
                    "model '{name}' not found in config. Available: {:?}",
                    config.models.iter().map(|m| m.name.as_str()).collect::<Vec<_>>()
                ),
            }
        })
        .collect()
}

fn evaluator_name(args: &RunArgs, config: &BenchConfig) -> String {
    args.evaluator
        .clone()
        .or_else(|| config.evaluator.clone())
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn execute(args: RunArgs) -> Result<()> {
    if let Some(parallelism) = args.parallelism {
        anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");
    }
    if let Some(max_attempts) = args.max_attempts {
        anyhow::ensure!(max_attempts >= 1, "max-attempts must be at least 1");
    }

    let mut config = load_config_from(args.config.as_deref())?;
    if let Some(parallelism) = args.parallelism {
        config.parallelism = parallelism;
    }
    if let Some(max_attempts) = args.max_attempts {
        config.max_attempts = max_attempts;
    }

    let questions = parser::load_question_set(&args.questions, args.key.as_deref())?;
    parser::validate_question_set(&questions)?;

    let models = select_models(&config, args.models.as_deref())?;
    parser::validate_models(&models)?;

    let registry = build_registry(&config, &models)?;
    let engine = EvalEngine::new(registry, config.engine_config());

    eprintln!(
        "choicebench v{}: {} questions x {} models, up to {} attempts each",
        env!("CARGO_PKG_VERSION"),
        questions.len(),
        models.len(),
        engine.config().max_attempts
    );
    eprintln!();

    let report = engine
        .run(questions.iter().cloned(), &models, &ConsoleReporter)
        .await?;

    print_summary(&report, &models)?;

    let output = args.output.clone().unwrap_or_else(|| config.output_dir.clone());
    let meta = ReportMetadata::for_report(&report, evaluator_name(&args, &config));
    let paths = write_all(&report, &questions, &meta, &output)?;

    eprintln!("Results saved to: {}", paths.results.display());
    eprintln!("Wrong answers: {}", paths.wrong_answers.display());
    eprintln!("Complete results: {}", paths.complete_results.display());

    Ok(())
}

fn print_summary(report: &EvaluationReport, models: &[ModelConfig]) -> Result<()> {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Model", "Vendor", "Correct", "Accuracy", "No answer"]);

    let scores = summarize(report)?;
    // Configured order, not name order
    for model in models {
        let Some(score) = scores.iter().find(|s| s.model == model.name) else {
            continue;
        };
        table.add_row(vec![
            Cell::new(&score.model),
            Cell::new(model.vendor),
            Cell::new(format!("{}/{}", score.correct, score.total)),
            Cell::new(format!("{:.2}%", score.accuracy)),
            Cell::new(score.parsing_failures),
        ]);
    }

    println!("\n{table}");
    Ok(())
}
