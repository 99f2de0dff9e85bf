//! The `choicebench init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create choicebench.toml
    if std::path::Path::new("choicebench.toml").exists() {
        println!("choicebench.toml already exists, skipping.");
    } else {
        std::fs::write("choicebench.toml", SAMPLE_CONFIG)?;
        println!("Created choicebench.toml");
    }

    // Create example question set
    std::fs::create_dir_all("questions")?;
    let example_path = std::path::Path::new("questions/example.json");
    if example_path.exists() {
        println!("questions/example.json already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUESTIONS)?;
        println!("Created questions/example.json");
    }

    println!("\nNext steps:");
    println!("  1. Export OPENAI_API_KEY, ANTHROPIC_API_KEY and GOOGLE_API_KEY, or edit choicebench.toml");
    println!("  2. Run: choicebench validate --questions questions/example.json");
    println!("  3. Run: choicebench run --questions questions/example.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# choicebench configuration

max_attempts = 3
attempt_timeout_secs = 120
parallelism = 1
output_dir = "./choicebench-results"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"

[providers.gemini]
type = "gemini"
api_key = "${GOOGLE_API_KEY}"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"
max_concurrent = 1
min_interval_ms = 500

[[models]]
name = "o3-mini-2025-01-31"
vendor = "openai"

[[models]]
name = "gpt-4o-2024-11-20"
vendor = "openai"
temperature = 0.0

[[models]]
name = "claude-3-5-sonnet-20241022"
vendor = "anthropic"
temperature = 0.0

[[models]]
name = "claude-3-5-haiku-20241022"
vendor = "anthropic"
temperature = 0.0

[[models]]
name = "gemini-2.0-flash-001"
vendor = "gemini"
temperature = 0.0

[[models]]
name = "llama3.2:3b"
vendor = "ollama"
temperature = 0.0

[[models]]
name = "gemma2:9b"
vendor = "ollama"
temperature = 0.0
"#;

const EXAMPLE_QUESTIONS: &str = r#"{
  "questions": [
    {
      "question_index": 1,
      "question_content": "Which dimensionless number compares inertial forces to viscous forces?",
      "options": [
        {"option_index": 1, "option_content": "Mach number"},
        {"option_index": 2, "option_content": "Reynolds number"},
        {"option_index": 3, "option_content": "Prandtl number"},
        {"option_index": 4, "option_content": "Froude number"}
      ],
      "correct_option_index": 2
    },
    {
      "question_index": 2,
      "question_content": "Which time-integration scheme is unconditionally stable for the linear diffusion equation?",
      "options": [
        {"option_index": 1, "option_content": "Forward Euler"},
        {"option_index": 2, "option_content": "Explicit Runge-Kutta (RK4)"},
        {"option_index": 3, "option_content": "Backward Euler"},
        {"option_index": 4, "option_content": "Leapfrog"}
      ],
      "correct_option_index": 3
    }
  ]
}
"#;
