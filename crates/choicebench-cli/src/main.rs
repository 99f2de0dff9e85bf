//! choicebench CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use choicebench_core::error::EvalError;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

const DEFAULT_LOG_FILTER: &str = "choicebench_core=info,choicebench_cli=info";

/// Exit status for malformed question sets or model line-ups.
const EXIT_INVALID_INPUT: i32 = 2;

#[derive(Parser)]
#[command(
    name = "choicebench",
    version,
    about = "Multiple-choice LLM benchmark harness"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate models against a question set
    Run {
        /// Path to the question set JSON
        #[arg(long)]
        questions: PathBuf,

        /// Key holding the question array (e.g. "CFD QA")
        #[arg(long)]
        key: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Models to evaluate: configured names or "vendor/model" (comma-separated)
        #[arg(long)]
        models: Option<String>,

        /// Max concurrent (question, model) pairs
        #[arg(long)]
        parallelism: Option<usize>,

        /// Attempts per question before giving up
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Name recorded in report metadata
        #[arg(long)]
        evaluator: Option<String>,
    },

    /// Validate a question set file
    Validate {
        /// Path to the question set JSON
        #[arg(long)]
        questions: PathBuf,

        /// Key holding the question array
        #[arg(long)]
        key: Option<String>,
    },

    /// List configured models
    ListModels {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example question set
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            questions,
            key,
            config,
            models,
            parallelism,
            max_attempts,
            output,
            evaluator,
        } => {
            commands::run::execute(commands::run::RunArgs {
                questions,
                key,
                config,
                models,
                parallelism,
                max_attempts,
                output,
                evaluator,
            })
            .await
        }
        Commands::Validate { questions, key } => commands::validate::execute(questions, key),
        Commands::ListModels { config } => commands::list_models::execute(config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(exit_code(&e));
    }
}

fn exit_code(e: &anyhow::Error) -> i32 {
    let invalid_input = e
        .chain()
        .filter_map(|cause| cause.downcast_ref::<EvalError>())
        .any(EvalError::is_input_validation);
    if invalid_input {
        EXIT_INVALID_INPUT
    } else {
        1
    }
}
