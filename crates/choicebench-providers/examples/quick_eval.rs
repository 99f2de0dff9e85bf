//! Quick eval example: programmatic use of choicebench with mock backends.
//!
//! No API keys or local models are needed; both backends are scripted.
//!
//! ```bash
//! cargo run -p choicebench-providers --example quick_eval
//! ```

use std::sync::Arc;

use choicebench_core::engine::{BackendRegistry, EvalEngine, EvalEngineConfig, NoopReporter};
use choicebench_core::model::{ModelConfig, Vendor};
use choicebench_core::parser;
use choicebench_core::statistics::summarize;
use choicebench_providers::mock::{MockBackend, MockReply};

const QUESTIONS: &str = r#"{
  "CFD QA": [
    {
      "question_index": 1,
      "question_content": "Which dimensionless number relates inertial to viscous forces?",
      "options": [
        {"option_index": 1, "option_content": "Reynolds number"},
        {"option_index": 2, "option_content": "Mach number"},
        {"option_index": 3, "option_content": "Prandtl number"},
        {"option_index": 4, "option_content": "Froude number"}
      ],
      "correct_option_index": 1
    },
    {
      "question_index": 2,
      "question_content": "Which scheme is unconditionally stable for the heat equation?",
      "options": [
        {"option_index": 1, "option_content": "Forward Euler"},
        {"option_index": 2, "option_content": "Crank-Nicolson"},
        {"option_index": 3, "option_content": "Leapfrog"},
        {"option_index": 4, "option_content": "Explicit upwind"}
      ],
      "correct_option_index": 2
    }
  ]
}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let questions = parser::parse_question_set_str(QUESTIONS, Some("CFD QA"))?;
    println!("Loaded {} questions", questions.len());

    // Knows the first answer, guesses 3 on everything else
    let chat = MockBackend::with_fixed_response(Vendor::Anthropic, "3")
        .with_response("inertial to viscous", MockReply::text("The answer is 1."));
    // Rambles once, then answers 2
    let local = MockBackend::scripted(
        Vendor::Ollama,
        vec![MockReply::text("Let me think."), MockReply::text("2")],
    );

    let mut registry = BackendRegistry::new();
    registry.register(Arc::new(chat), None);
    registry.register(Arc::new(local), None);

    let engine = EvalEngine::new(
        registry,
        EvalEngineConfig {
            parallelism: 2,
            ..Default::default()
        },
    );

    let models = vec![
        ModelConfig::new("claude-3-5-haiku", Vendor::Anthropic),
        ModelConfig::new("llama3.2:3b", Vendor::Ollama),
    ];

    println!("\nRunning evaluation...\n");
    let report = engine.run(questions, &models, &NoopReporter).await?;

    println!("Evaluation complete in {}ms", report.duration_ms);
    for score in summarize(&report)? {
        println!(
            "  {}: {}/{} correct ({:.2}%), {} without an answer",
            score.model, score.correct, score.total, score.accuracy, score.parsing_failures
        );
    }

    Ok(())
}
