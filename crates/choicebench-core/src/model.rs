//! Core data model types for choicebench.
//!
//! Questions and model configurations are inputs and never change once
//! loaded. Attempt and question results are produced by the engine and are
//! never mutated after creation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of options every question must carry.
pub const OPTION_COUNT: usize = 4;

/// Sentinel `model_answer` meaning no valid answer was extracted.
pub const UNRESOLVED_ANSWER: u8 = 0;

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique, stable question index.
    #[serde(rename = "question_index")]
    pub index: u32,
    /// The question text.
    #[serde(rename = "question_content")]
    pub content: String,
    /// The four options, in presentation order.
    pub options: Vec<QuestionOption>,
    /// Index (1..=4) of the correct option.
    pub correct_option_index: u8,
}

/// One answer option of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Option number shown to the model (1..=4).
    pub option_index: u8,
    /// Option text.
    pub option_content: String,
}

/// Supported backend vendors.
///
/// Deserializes through [`FromStr`], so config files accept the same
/// aliases as the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Vendor {
    OpenAi,
    Anthropic,
    Gemini,
    Ollama,
}

impl Vendor {
    /// All known vendors.
    pub const ALL: [Vendor; 4] = [
        Vendor::OpenAi,
        Vendor::Anthropic,
        Vendor::Gemini,
        Vendor::Ollama,
    ];

    /// The prompt layout this vendor expects unless a model overrides it.
    pub fn default_prompt_style(&self) -> PromptStyle {
        match self {
            Vendor::Ollama => PromptStyle::Completion,
            _ => PromptStyle::Chat,
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vendor::OpenAi => write!(f, "openai"),
            Vendor::Anthropic => write!(f, "anthropic"),
            Vendor::Gemini => write!(f, "gemini"),
            Vendor::Ollama => write!(f, "ollama"),
        }
    }
}

impl FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Vendor::OpenAi),
            "anthropic" | "claude" => Ok(Vendor::Anthropic),
            "gemini" | "google" | "genai" => Ok(Vendor::Gemini),
            "ollama" => Ok(Vendor::Ollama),
            other => Err(format!("unknown vendor: {other}")),
        }
    }
}

impl TryFrom<String> for Vendor {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// How the user prompt for a question is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// Numbered question for chat-style APIs that also receive a system prompt.
    Chat,
    /// Self-contained instruction for raw completion endpoints.
    Completion,
}

/// One evaluable backend model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Unique name used as the key in results.
    pub name: String,
    /// Which backend serves this model.
    pub vendor: Vendor,
    /// Vendor-specific call options.
    #[serde(flatten)]
    pub parameters: ModelParameters,
}

/// Call options forwarded to the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Nominal model id sent to the vendor. Defaults to the config name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Sampling temperature. `None` omits it from the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum output tokens, for vendors that accept a limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Prompt layout override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_style: Option<PromptStyle>,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>, vendor: Vendor) -> Self {
        Self {
            name: name.into(),
            vendor,
            parameters: ModelParameters::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.parameters.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.parameters.temperature = Some(temperature);
        self
    }

    /// The model id to send to the vendor.
    pub fn model_id(&self) -> &str {
        self.parameters.model.as_deref().unwrap_or(&self.name)
    }

    /// The effective prompt layout for this model.
    pub fn prompt_style(&self) -> PromptStyle {
        self.parameters
            .prompt_style
            .unwrap_or_else(|| self.vendor.default_prompt_style())
    }
}

/// One request-and-parse cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt number.
    pub attempt_number: u32,
    /// Backend text, or an `[Error: ...]` sentinel on transport failure.
    pub raw_text: String,
    /// The extracted answer, if this attempt parsed.
    pub parsed_answer: Option<u8>,
}

/// The outcome of one (question, model) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_index: u32,
    /// The resolved answer, or [`UNRESOLVED_ANSWER`].
    pub model_answer: u8,
    pub correct_answer: u8,
    pub attempts: Vec<AttemptRecord>,
    pub is_correct: bool,
    pub parsing_failed: bool,
}

impl QuestionResult {
    /// Raw texts of every attempt, in order.
    pub fn raw_responses(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.raw_text.as_str()).collect()
    }
}

/// Running results for one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub correct_count: u32,
    pub total: u32,
    pub results: Vec<QuestionResult>,
}

impl ModelSummary {
    /// Append one pair result and update the counters.
    pub fn record(&mut self, result: QuestionResult) {
        if result.is_correct {
            self.correct_count += 1;
        }
        self.total += 1;
        self.results.push(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_display_and_parse() {
        assert_eq!(Vendor::OpenAi.to_string(), "openai");
        assert_eq!("claude".parse::<Vendor>().unwrap(), Vendor::Anthropic);
        assert_eq!("GenAI".parse::<Vendor>().unwrap(), Vendor::Gemini);
        assert_eq!("ollama".parse::<Vendor>().unwrap(), Vendor::Ollama);
        assert!("mistral".parse::<Vendor>().is_err());
    }

    #[test]
    fn vendor_deserializes_aliases() {
        let parse = |s: &str| serde_json::from_str::<Vendor>(&format!("\"{s}\""));
        assert_eq!(parse("claude").unwrap(), Vendor::Anthropic);
        assert_eq!(parse("google").unwrap(), Vendor::Gemini);
        assert_eq!(parse("Ollama").unwrap(), Vendor::Ollama);
        assert!(parse("mistral").unwrap_err().to_string().contains("unknown vendor"));
        assert_eq!(serde_json::to_string(&Vendor::OpenAi).unwrap(), "\"openai\"");
    }

    #[test]
    fn model_id_falls_back_to_name() {
        let plain = ModelConfig::new("gpt-4o-2024-11-20", Vendor::OpenAi);
        assert_eq!(plain.model_id(), "gpt-4o-2024-11-20");

        let aliased = ModelConfig::new("llama", Vendor::Ollama).with_model("llama3.2:3b");
        assert_eq!(aliased.model_id(), "llama3.2:3b");
    }

    #[test]
    fn prompt_style_defaults_per_vendor() {
        assert_eq!(
            ModelConfig::new("a", Vendor::Anthropic).prompt_style(),
            PromptStyle::Chat
        );
        assert_eq!(
            ModelConfig::new("b", Vendor::Ollama).prompt_style(),
            PromptStyle::Completion
        );

        let mut overridden = ModelConfig::new("c", Vendor::Ollama);
        overridden.parameters.prompt_style = Some(PromptStyle::Chat);
        assert_eq!(overridden.prompt_style(), PromptStyle::Chat);
    }

    #[test]
    fn question_uses_wire_field_names() {
        let json = r#"{
            "question_index": 7,
            "question_content": "Pick one",
            "options": [
                {"option_index": 1, "option_content": "a"},
                {"option_index": 2, "option_content": "b"},
                {"option_index": 3, "option_content": "c"},
                {"option_index": 4, "option_content": "d"}
            ],
            "correct_option_index": 3
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.index, 7);
        assert_eq!(q.options.len(), OPTION_COUNT);
        assert_eq!(q.correct_option_index, 3);
    }

    #[test]
    fn summary_record_counts_only_correct() {
        let mut summary = ModelSummary::default();
        let base = QuestionResult {
            question_index: 1,
            model_answer: 2,
            correct_answer: 2,
            attempts: vec![],
            is_correct: true,
            parsing_failed: false,
        };
        summary.record(base.clone());
        summary.record(QuestionResult {
            question_index: 2,
            is_correct: false,
            ..base
        });
        assert_eq!(summary.correct_count, 1);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.results.len(), 2);
    }
}
