//! Prompt rendering for multiple-choice questions.

use std::fmt::Write;

use crate::model::{PromptStyle, Question};

/// Default system instruction sent alongside every question.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert researcher in this subject area.\n\
For each multiple-choice question, read the question and its four options,\n\
then respond with only the number (1, 2, 3, or 4) corresponding to the correct answer.";

const CHAT_INSTRUCTION: &str = "\nReply with only the option number.";
const COMPLETION_HEADER: &str =
    "Analyze this multiple-choice question and provide ONLY the correct option number (1-4):";
const COMPLETION_INSTRUCTION: &str = "\nRespond with just the number:";

/// Render the user-facing prompt for a question.
pub fn render_prompt(question: &Question, style: PromptStyle) -> String {
    let mut prompt = String::new();
    match style {
        PromptStyle::Chat => {
            let _ = writeln!(prompt, "Question {}: {}", question.index, question.content);
        }
        PromptStyle::Completion => {
            let _ = writeln!(prompt, "{COMPLETION_HEADER}\n{}", question.content);
        }
    }
    for option in &question.options {
        let _ = writeln!(prompt, "{}. {}", option.option_index, option.option_content);
    }
    prompt.push_str(match style {
        PromptStyle::Chat => CHAT_INSTRUCTION,
        PromptStyle::Completion => COMPLETION_INSTRUCTION,
    });
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionOption;

    fn sample() -> Question {
        Question {
            index: 12,
            content: "Which is prime?".into(),
            options: ["4", "6", "7", "9"]
                .iter()
                .enumerate()
                .map(|(i, text)| QuestionOption {
                    option_index: i as u8 + 1,
                    option_content: text.to_string(),
                })
                .collect(),
            correct_option_index: 3,
        }
    }

    #[test]
    fn chat_prompt_layout() {
        let prompt = render_prompt(&sample(), PromptStyle::Chat);
        assert_eq!(
            prompt,
            "Question 12: Which is prime?\n1. 4\n2. 6\n3. 7\n4. 9\n\nReply with only the option number."
        );
    }

    #[test]
    fn completion_prompt_layout() {
        let prompt = render_prompt(&sample(), PromptStyle::Completion);
        assert!(prompt.starts_with(COMPLETION_HEADER));
        assert!(prompt.contains("\nWhich is prime?\n1. 4\n"));
        assert!(prompt.ends_with("\nRespond with just the number:"));
    }
}
