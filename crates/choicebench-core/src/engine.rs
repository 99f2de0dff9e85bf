//! Central eval engine orchestrator.
//!
//! Runs every question against every configured model (questions outer,
//! models inner), resolving each pair through the retry loop, and merges
//! the results into per-model summaries. Pairs may run concurrently; the
//! merged output is ordered exactly as the sequential schedule would be.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::error::EvalError;
use crate::model::{AttemptRecord, ModelConfig, ModelSummary, Question, QuestionResult, Vendor};
use crate::parser::{validate_models, validate_question_set};
use crate::prompt::{render_prompt, DEFAULT_SYSTEM_PROMPT};
use crate::report::EvaluationReport;
use crate::retry::{resolve_answer, RetryOutcome, DEFAULT_MAX_ATTEMPTS};
use crate::traits::{Backend, PromptRequest, Reply};

/// Configuration for the eval engine.
#[derive(Debug, Clone)]
pub struct EvalEngineConfig {
    /// Maximum concurrent (question, model) pairs. 1 is fully sequential.
    pub parallelism: usize,
    /// Attempt budget per pair.
    pub max_attempts: u32,
    /// Deadline for a single backend call.
    pub attempt_timeout: Option<Duration>,
    /// System instruction sent with every question.
    pub system_prompt: String,
}

impl Default for EvalEngineConfig {
    fn default() -> Self {
        Self {
            parallelism: 1,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: Some(Duration::from_secs(120)),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Call limiter
// ---------------------------------------------------------------------------

/// Serializes load on a backend.
///
/// A permit is held for the duration of the call plus `min_interval`, so
/// with `max_concurrent = 1` consecutive calls are spaced by at least
/// `min_interval` whether they succeeded or not.
#[derive(Debug)]
pub struct CallLimiter {
    permits: Semaphore,
    min_interval: Duration,
}

impl CallLimiter {
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Self {
        Self {
            permits: Semaphore::new(max_concurrent.max(1)),
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Run `call` while holding a permit, then wait out the interval.
    pub async fn run<F, T>(&self, call: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        // The semaphore is never closed, so acquire cannot fail.
        let _permit = self.permits.acquire().await.ok();
        let out = call.await;
        if !self.min_interval.is_zero() {
            tokio::time::sleep(self.min_interval).await;
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Backend registry
// ---------------------------------------------------------------------------

struct RegisteredBackend {
    backend: Arc<dyn Backend>,
    limiter: Option<Arc<CallLimiter>>,
}

/// The set of backends available to a run, keyed by vendor.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<Vendor, RegisteredBackend>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend for its vendor, replacing any previous one.
    pub fn register(&mut self, backend: Arc<dyn Backend>, limiter: Option<CallLimiter>) {
        if let Some(limiter) = &limiter {
            tracing::debug!(
                vendor = %backend.vendor(),
                min_interval_ms = limiter.min_interval().as_millis() as u64,
                "backend calls are paced"
            );
        }
        self.backends.insert(
            backend.vendor(),
            RegisteredBackend {
                backend,
                limiter: limiter.map(Arc::new),
            },
        );
    }

    pub fn contains(&self, vendor: Vendor) -> bool {
        self.backends.contains_key(&vendor)
    }

    pub fn vendors(&self) -> Vec<Vendor> {
        let mut vendors: Vec<Vendor> = self.backends.keys().copied().collect();
        vendors.sort();
        vendors
    }

    fn get(&self, vendor: Vendor) -> Option<(Arc<dyn Backend>, Option<Arc<CallLimiter>>)> {
        self.backends
            .get(&vendor)
            .map(|r| (Arc::clone(&r.backend), r.limiter.clone()))
    }
}

/// Perform one backend call, turning errors and timeouts into a sentinel.
pub async fn invoke_backend(
    backend: &dyn Backend,
    limiter: Option<&CallLimiter>,
    config: &ModelConfig,
    request: &PromptRequest,
    timeout: Option<Duration>,
) -> Reply {
    let call = async {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, backend.invoke(config, request)).await
            {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!(
                    "attempt timed out after {}s",
                    limit.as_secs_f64()
                )),
            },
            None => backend.invoke(config, request).await,
        }
    };

    let result = match limiter {
        Some(limiter) => limiter.run(call).await,
        None => call.await,
    };

    match result {
        Ok(text) => Reply::Text(text.trim().to_string()),
        Err(e) => {
            tracing::warn!(model = %config.name, "backend call failed: {e:#}");
            Reply::failed(format!("{e:#}"))
        }
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_attempt(&self, model: &str, question_index: u32, attempt: &AttemptRecord);
    fn on_pair_complete(&self, model: &str, result: &QuestionResult);
    fn on_run_complete(&self, pairs: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_attempt(&self, _: &str, _: u32, _: &AttemptRecord) {}
    fn on_pair_complete(&self, _: &str, _: &QuestionResult) {}
    fn on_run_complete(&self, _: usize, _: Duration) {}
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score a retry outcome against the expected answer.
///
/// A pair that exhausted its budget is never correct.
pub fn score_outcome(question: &Question, outcome: RetryOutcome) -> QuestionResult {
    let is_correct =
        outcome.model_answer == question.correct_option_index && !outcome.parsing_failed;
    QuestionResult {
        question_index: question.index,
        model_answer: outcome.model_answer,
        correct_answer: question.correct_option_index,
        attempts: outcome.attempts,
        is_correct,
        parsing_failed: outcome.parsing_failed,
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The central eval engine.
pub struct EvalEngine {
    registry: BackendRegistry,
    config: EvalEngineConfig,
}

impl EvalEngine {
    pub fn new(registry: BackendRegistry, config: EvalEngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &EvalEngineConfig {
        &self.config
    }

    /// Evaluate every question against every model.
    ///
    /// Fails before any backend call if the questions or models are
    /// malformed, or if a model's vendor has no registered backend.
    pub async fn run<I>(
        &self,
        questions: I,
        models: &[ModelConfig],
        progress: &dyn ProgressReporter,
    ) -> Result<EvaluationReport>
    where
        I: IntoIterator<Item = Question>,
    {
        let start = Instant::now();
        let questions: Vec<Question> = questions.into_iter().collect();

        validate_question_set(&questions)?;
        validate_models(models)?;
        if questions.is_empty() {
            return Err(EvalError::EmptyQuestionSet.into());
        }
        for model in models {
            if !self.registry.contains(model.vendor) {
                return Err(EvalError::BackendMissing(model.vendor).into());
            }
        }

        tracing::info!(
            questions = questions.len(),
            models = models.len(),
            parallelism = self.config.parallelism,
            backends = ?self.registry.vendors(),
            "starting evaluation"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut futures = FuturesUnordered::new();

        for (q_pos, question) in questions.iter().enumerate() {
            for (m_pos, model) in models.iter().enumerate() {
                let Some((backend, limiter)) = self.registry.get(model.vendor) else {
                    continue;
                };
                let semaphore = Arc::clone(&semaphore);
                let request = PromptRequest {
                    system_prompt: self.config.system_prompt.clone(),
                    user_prompt: render_prompt(question, model.prompt_style()),
                };
                let max_attempts = self.config.max_attempts;
                let timeout = self.config.attempt_timeout;

                futures.push(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    let outcome = resolve_answer(
                        max_attempts,
                        |_| {
                            invoke_backend(
                                backend.as_ref(),
                                limiter.as_deref(),
                                model,
                                &request,
                                timeout,
                            )
                        },
                        |record| {
                            tracing::debug!(
                                model = %model.name,
                                question = question.index,
                                attempt = record.attempt_number,
                                raw = %record.raw_text,
                                parsed = ?record.parsed_answer,
                                "attempt finished"
                            );
                            progress.on_attempt(&model.name, question.index, record);
                        },
                    )
                    .await;
                    (q_pos, m_pos, score_outcome(question, outcome))
                });
            }
        }

        let pairs = futures.len();
        let mut slots: Vec<Vec<Option<QuestionResult>>> =
            vec![vec![None; models.len()]; questions.len()];

        while let Some((q_pos, m_pos, result)) = futures.next().await {
            let model = &models[m_pos];
            if result.parsing_failed {
                tracing::warn!(
                    model = %model.name,
                    question = result.question_index,
                    "no answer after {} attempts",
                    result.attempts.len()
                );
            }
            progress.on_pair_complete(&model.name, &result);
            slots[q_pos][m_pos] = Some(result);
        }

        let mut summaries: BTreeMap<String, ModelSummary> = models
            .iter()
            .map(|m| (m.name.clone(), ModelSummary::default()))
            .collect();
        for row in slots {
            for (m_pos, result) in row.into_iter().enumerate() {
                if let (Some(result), Some(summary)) =
                    (result, summaries.get_mut(&models[m_pos].name))
                {
                    summary.record(result);
                }
            }
        }

        let elapsed = start.elapsed();
        progress.on_run_complete(pairs, elapsed);

        for (name, summary) in &summaries {
            tracing::info!(
                model = %name,
                correct = summary.correct_count,
                total = summary.total,
                "model finished"
            );
        }

        Ok(EvaluationReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            total_questions: questions.len() as u32,
            models: summaries,
            duration_ms: elapsed.as_millis() as u64,
        })
    }
}
