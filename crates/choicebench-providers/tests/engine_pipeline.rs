//! End-to-end pipeline tests: question set -> engine -> scored report,
//! driven through mock and HTTP-mocked backends.

use std::sync::Arc;

use choicebench_core::engine::{BackendRegistry, EvalEngine, EvalEngineConfig, NoopReporter};
use choicebench_core::model::{ModelConfig, Question, QuestionOption, Vendor, UNRESOLVED_ANSWER};
use choicebench_core::parser::parse_question_set_str;
use choicebench_core::statistics::summarize;
use choicebench_providers::config::parse_config;
use choicebench_providers::mock::{MockBackend, MockReply};
use choicebench_providers::build_registry;

fn question(index: u32, content: &str, correct: u8) -> Question {
    Question {
        index,
        content: content.into(),
        options: (1..=4)
            .map(|i| QuestionOption {
                option_index: i,
                option_content: format!("choice {i}"),
            })
            .collect(),
        correct_option_index: correct,
    }
}

fn engine(registry: BackendRegistry, parallelism: usize) -> EvalEngine {
    EvalEngine::new(
        registry,
        EvalEngineConfig {
            parallelism,
            attempt_timeout: None,
            ..EvalEngineConfig::default()
        },
    )
}

#[tokio::test]
async fn two_vendors_scored_independently() {
    let questions = vec![
        question(1, "alpha", 1),
        question(2, "beta", 2),
        question(3, "gamma", 3),
    ];

    // Gets alpha and gamma right; beta is answered with prose that still
    // starts with a digit.
    let openai = Arc::new(
        MockBackend::with_fixed_response(Vendor::OpenAi, "1")
            .with_response("beta", MockReply::text("4, because reasons"))
            .with_response("gamma", MockReply::text("3")),
    );
    // Always says 2.
    let anthropic = Arc::new(MockBackend::with_fixed_response(Vendor::Anthropic, "2"));

    let mut registry = BackendRegistry::new();
    registry.register(openai.clone(), None);
    registry.register(anthropic.clone(), None);

    let models = vec![
        ModelConfig::new("gpt", Vendor::OpenAi),
        ModelConfig::new("claude", Vendor::Anthropic),
    ];

    let report = engine(registry, 1)
        .run(questions, &models, &NoopReporter)
        .await
        .unwrap();

    assert_eq!(report.total_questions, 3);
    assert_eq!(openai.call_count(), 3);
    assert_eq!(anthropic.call_count(), 3);

    let gpt = &report.models["gpt"];
    assert_eq!(gpt.correct_count, 2);
    assert_eq!(gpt.results[1].model_answer, 4);
    assert!(!gpt.results[1].parsing_failed);

    let claude = &report.models["claude"];
    assert_eq!(claude.correct_count, 1);
    assert!(claude.results[1].is_correct);

    let scores = summarize(&report).unwrap();
    assert_eq!(scores[0].model, "claude");
    assert!((scores[0].accuracy - 100.0 / 3.0).abs() < 1e-9);
    assert!((scores[1].accuracy - 200.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn transport_errors_consume_attempts_but_never_answer() {
    // The error text carries a digit that would parse if it reached the
    // extractor.
    let backend = Arc::new(MockBackend::scripted(
        Vendor::Gemini,
        vec![MockReply::error("3 retries exhausted upstream")],
    ));
    let mut registry = BackendRegistry::new();
    registry.register(backend.clone(), None);

    let report = engine(registry, 1)
        .run(
            vec![question(9, "delta", 3)],
            &[ModelConfig::new("flash", Vendor::Gemini)],
            &NoopReporter,
        )
        .await
        .unwrap();

    let result = &report.models["flash"].results[0];
    assert_eq!(backend.call_count(), 3);
    assert_eq!(result.attempts.len(), 3);
    assert_eq!(result.model_answer, UNRESOLVED_ANSWER);
    assert!(result.parsing_failed);
    assert!(!result.is_correct);
    assert!(result.raw_responses().iter().all(|r| r.starts_with("[Error: ")));
}

#[tokio::test]
async fn recovers_after_failed_attempts() {
    let backend = Arc::new(MockBackend::scripted(
        Vendor::Ollama,
        vec![
            MockReply::error("connection reset"),
            MockReply::text("I am not sure"),
            MockReply::text("2"),
        ],
    ));
    let mut registry = BackendRegistry::new();
    registry.register(backend.clone(), None);

    let report = engine(registry, 1)
        .run(
            vec![question(1, "epsilon", 2)],
            &[ModelConfig::new("llama3.2:3b", Vendor::Ollama)],
            &NoopReporter,
        )
        .await
        .unwrap();

    let result = &report.models["llama3.2:3b"].results[0];
    assert_eq!(result.attempts.len(), 3);
    assert_eq!(result.attempts[2].parsed_answer, Some(2));
    assert!(result.is_correct);
    assert!(!result.parsing_failed);

    // Completion-style prompt for the local vendor.
    let last = backend.last_request().unwrap();
    assert!(last.user_prompt.starts_with("Analyze this multiple-choice question"));
}

#[tokio::test]
async fn parallel_run_matches_question_order() {
    let json = r#"{"CFD QA": [
        {"question_index": 30, "question_content": "q30", "correct_option_index": 1,
         "options": [{"option_index": 1, "option_content": "a"}, {"option_index": 2, "option_content": "b"},
                     {"option_index": 3, "option_content": "c"}, {"option_index": 4, "option_content": "d"}]},
        {"question_index": 10, "question_content": "q10", "correct_option_index": 2,
         "options": [{"option_index": 1, "option_content": "a"}, {"option_index": 2, "option_content": "b"},
                     {"option_index": 3, "option_content": "c"}, {"option_index": 4, "option_content": "d"}]},
        {"question_index": 20, "question_content": "q20", "correct_option_index": 3,
         "options": [{"option_index": 1, "option_content": "a"}, {"option_index": 2, "option_content": "b"},
                     {"option_index": 3, "option_content": "c"}, {"option_index": 4, "option_content": "d"}]}
    ]}"#;
    let questions = parse_question_set_str(json, Some("CFD QA")).unwrap();

    let backend = Arc::new(MockBackend::with_fixed_response(Vendor::OpenAi, "2"));
    let mut registry = BackendRegistry::new();
    registry.register(backend, None);

    let report = engine(registry, 8)
        .run(
            questions,
            &[
                ModelConfig::new("a", Vendor::OpenAi),
                ModelConfig::new("b", Vendor::OpenAi),
            ],
            &NoopReporter,
        )
        .await
        .unwrap();

    for summary in report.models.values() {
        let order: Vec<u32> = summary.results.iter().map(|r| r.question_index).collect();
        assert_eq!(order, vec![30, 10, 20]);
        assert_eq!(summary.correct_count, 1);
    }
}

#[tokio::test]
async fn configured_http_backend_end_to_end() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "4"}}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let config = parse_config(&format!(
        r#"
attempt_timeout_secs = 5

[providers.openai]
type = "openai"
api_key = "sk-test"
base_url = "{}"

[[models]]
name = "gpt-4o-2024-11-20"
vendor = "openai"
temperature = 0.0
"#,
        server.uri()
    ))
    .unwrap();

    let registry = build_registry(&config, &config.models).unwrap();
    let report = EvalEngine::new(registry, config.engine_config())
        .run(
            vec![question(1, "x", 4), question(2, "y", 1)],
            &config.models,
            &NoopReporter,
        )
        .await
        .unwrap();

    let summary = &report.models["gpt-4o-2024-11-20"];
    assert_eq!(summary.correct_count, 1);
    assert_eq!(summary.total, 2);
}
