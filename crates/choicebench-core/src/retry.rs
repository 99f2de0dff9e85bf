//! Bounded retry around one (question, model) pair.
//!
//! Each attempt asks the backend for a reply and runs
//! [`parse_with_retry`](crate::extract::parse_with_retry) on it. The first
//! attempt that parses ends the loop. If every attempt fails, the pair
//! resolves to [`UNRESOLVED_ANSWER`] with `parsing_failed` set.
//!
//! A [`Reply::Failed`] is never handed to the extractor: transport errors
//! always count as a failed parse and consume an attempt.

use std::future::Future;

use crate::extract::parse_with_retry;
use crate::model::{AttemptRecord, UNRESOLVED_ANSWER};
use crate::traits::Reply;

/// Attempt budget per (question, model) pair.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Final state of the retry loop for one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome {
    /// The resolved answer, or [`UNRESOLVED_ANSWER`] after exhaustion.
    pub model_answer: u8,
    /// Every attempt in order.
    pub attempts: Vec<AttemptRecord>,
    /// `true` exactly when the budget was exhausted.
    pub parsing_failed: bool,
}

/// Run up to `max_attempts` attempts, stopping at the first parsed answer.
///
/// `call` receives the 1-based attempt number. `observe` sees each attempt
/// record as soon as it is created.
pub async fn resolve_answer<F, Fut, O>(max_attempts: u32, mut call: F, mut observe: O) -> RetryOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Reply>,
    O: FnMut(&AttemptRecord),
{
    let max_attempts = max_attempts.max(1);
    let mut attempts = Vec::with_capacity(max_attempts as usize);

    for attempt_number in 1..=max_attempts {
        let reply = call(attempt_number).await;

        let parsed_answer = if reply.is_failed() {
            tracing::debug!(attempt = attempt_number, "backend failure: {}", reply.raw_text());
            None
        } else {
            match parse_with_retry(reply.raw_text()) {
                Ok(answer) => Some(answer),
                Err(e) => {
                    tracing::debug!(attempt = attempt_number, "{e}");
                    None
                }
            }
        };

        let record = AttemptRecord {
            attempt_number,
            raw_text: reply.raw_text().to_string(),
            parsed_answer,
        };
        observe(&record);
        attempts.push(record);

        if let Some(answer) = parsed_answer {
            return RetryOutcome {
                model_answer: answer,
                attempts,
                parsing_failed: false,
            };
        }

        if attempt_number < max_attempts {
            tracing::debug!(attempt = attempt_number, "parse failed, retrying");
        }
    }

    tracing::warn!("all {max_attempts} attempts failed, marking as unresolved");
    RetryOutcome {
        model_answer: UNRESOLVED_ANSWER,
        attempts,
        parsing_failed: true,
    }
}
