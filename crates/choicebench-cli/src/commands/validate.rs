//! The `choicebench validate` command.

use std::path::PathBuf;

use anyhow::Result;

use choicebench_core::parser::{load_question_set, validate_question_set};

pub fn execute(questions_path: PathBuf, key: Option<String>) -> Result<()> {
    let questions = load_question_set(&questions_path, key.as_deref())?;
    println!(
        "Question set: {} ({} questions)",
        questions_path.display(),
        questions.len()
    );

    validate_question_set(&questions)?;
    anyhow::ensure!(!questions.is_empty(), "question set is empty");

    println!("All questions valid.");
    Ok(())
}
