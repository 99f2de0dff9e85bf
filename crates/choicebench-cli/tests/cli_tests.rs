//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn choicebench() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("choicebench").unwrap()
}

fn question_json(index: u32, correct: u8, option_count: u8) -> String {
    let options: Vec<String> = (1..=option_count)
        .map(|i| format!(r#"{{"option_index": {i}, "option_content": "option {i}"}}"#))
        .collect();
    format!(
        r#"{{"question_index": {index}, "question_content": "Question {index}?", "options": [{}], "correct_option_index": {correct}}}"#,
        options.join(", ")
    )
}

fn write_questions(dir: &Path, name: &str, questions: &[String]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(
        &path,
        format!(r#"{{"CFD QA": [{}]}}"#, questions.join(",\n")),
    )
    .unwrap();
    path
}

#[test]
fn validate_valid_question_set() {
    let dir = TempDir::new().unwrap();
    let path = write_questions(
        dir.path(),
        "qs.json",
        &[question_json(1, 2, 4), question_json(2, 4, 4)],
    );

    choicebench()
        .arg("validate")
        .arg("--questions")
        .arg(&path)
        .arg("--key")
        .arg("CFD QA")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 questions"))
        .stdout(predicate::str::contains("All questions valid"));
}

#[test]
fn validate_rejects_three_options() {
    let dir = TempDir::new().unwrap();
    let path = write_questions(dir.path(), "bad.json", &[question_json(7, 1, 3)]);

    choicebench()
        .arg("validate")
        .arg("--questions")
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("invalid question 7"));
}

#[test]
fn validate_nonexistent_file() {
    choicebench()
        .arg("validate")
        .arg("--questions")
        .arg("nonexistent.json")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    choicebench()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created choicebench.toml"))
        .stdout(predicate::str::contains("Created questions/example.json"));

    assert!(dir.path().join("choicebench.toml").exists());
    assert!(dir.path().join("questions/example.json").exists());

    // The generated example is itself a valid question set.
    choicebench()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--questions")
        .arg("questions/example.json")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 questions"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    // First init
    choicebench()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    // Second init should skip
    choicebench()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn list_models_from_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("choicebench.toml");
    std::fs::write(
        &config,
        r#"
[[models]]
name = "sonnet"
vendor = "anthropic"
model = "claude-3-5-sonnet-20241022"
temperature = 0.0

[[models]]
name = "gemma2:9b"
vendor = "ollama"
"#,
    )
    .unwrap();

    choicebench()
        .env_remove("ANTHROPIC_API_KEY")
        .arg("list-models")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Vendor: anthropic (not configured)"))
        .stdout(predicate::str::contains("sonnet: model claude-3-5-sonnet-20241022"))
        .stdout(predicate::str::contains("completion prompt"));
}

#[test]
fn run_with_unreachable_backend_records_failures() {
    let dir = TempDir::new().unwrap();
    let questions = write_questions(
        dir.path(),
        "qs.json",
        &[question_json(1, 1, 4), question_json(2, 3, 4)],
    );
    let config = dir.path().join("choicebench.toml");
    std::fs::write(
        &config,
        r#"
attempt_timeout_secs = 10

[providers.local]
type = "ollama"
base_url = "http://127.0.0.1:9"
min_interval_ms = 0

[[models]]
name = "llama3.2:3b"
vendor = "ollama"
temperature = 0.0
"#,
    )
    .unwrap();
    let output = dir.path().join("results");

    choicebench()
        .env_remove("OLLAMA_HOST")
        .arg("run")
        .arg("--questions")
        .arg(&questions)
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&output)
        .arg("--evaluator")
        .arg("ci")
        .assert()
        .success()
        .stdout(predicate::str::contains("llama3.2:3b"))
        .stdout(predicate::str::contains("0.00%"));

    let entries: Vec<String> = std::fs::read_dir(&output)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(entries.iter().any(|e| e.starts_with("evaluation_results_")));
    assert!(entries.iter().any(|e| e.starts_with("wrong_answers_")));

    let complete_dir = entries
        .iter()
        .find(|e| e.starts_with("complete_results_"))
        .map(|e| output.join(e))
        .unwrap();
    let complete: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(complete_dir.join("llama3.2-3b.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(complete["metadata"]["evaluator"], "ci");

    let answers = complete["evaluation_results"]["answers"].as_array().unwrap();
    assert_eq!(answers.len(), 2);
    for answer in answers {
        assert_eq!(answer["model_answer"], 0);
        assert_eq!(answer["parsing_failed"], true);
        assert_eq!(answer["raw_responses"].as_array().unwrap().len(), 3);
    }
}

#[test]
fn run_rejects_invalid_questions() {
    let dir = TempDir::new().unwrap();
    let questions = write_questions(
        dir.path(),
        "dup.json",
        &[question_json(1, 1, 4), question_json(1, 2, 4)],
    );

    choicebench()
        .arg("run")
        .arg("--questions")
        .arg(&questions)
        .arg("--models")
        .arg("ollama/llama3.2:3b")
        .arg("--output")
        .arg(dir.path().join("out"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error"));

    assert!(!dir.path().join("out").exists());
}

#[test]
fn help_output() {
    choicebench()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Multiple-choice LLM benchmark harness"));
}
