//! Benchmark configuration and backend factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use choicebench_core::engine::{BackendRegistry, CallLimiter, EvalEngineConfig};
use choicebench_core::model::{ModelConfig, Vendor};
use choicebench_core::prompt::DEFAULT_SYSTEM_PROMPT;
use choicebench_core::retry::DEFAULT_MAX_ATTEMPTS;
use choicebench_core::traits::Backend;

use crate::anthropic::AnthropicBackend;
use crate::gemini::GeminiBackend;
use crate::ollama::{OllamaBackend, DEFAULT_BASE_URL as DEFAULT_OLLAMA_URL};
use crate::openai::OpenAiBackend;

/// Connection details for a single vendor.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Anthropic {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Gemini {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Anthropic {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Gemini {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
        }
    }
}

impl ProviderConfig {
    pub fn vendor(&self) -> Vendor {
        match self {
            ProviderConfig::OpenAI { .. } => Vendor::OpenAi,
            ProviderConfig::Anthropic { .. } => Vendor::Anthropic,
            ProviderConfig::Gemini { .. } => Vendor::Gemini,
            ProviderConfig::Ollama { .. } => Vendor::Ollama,
        }
    }

    fn empty(vendor: Vendor) -> Self {
        match vendor {
            Vendor::OpenAi => ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            },
            Vendor::Anthropic => ProviderConfig::Anthropic {
                api_key: String::new(),
                base_url: None,
            },
            Vendor::Gemini => ProviderConfig::Gemini {
                api_key: String::new(),
                base_url: None,
            },
            Vendor::Ollama => ProviderConfig::Ollama {
                base_url: default_ollama_url(),
            },
        }
    }
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

/// A provider entry plus its call pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(flatten)]
    pub kind: ProviderConfig,
    /// Calls allowed in flight at once.
    #[serde(default)]
    pub max_concurrent: Option<usize>,
    /// Pause held after every call, successful or not.
    #[serde(default)]
    pub min_interval_ms: Option<u64>,
}

impl ProviderSettings {
    pub fn new(kind: ProviderConfig) -> Self {
        Self {
            kind,
            max_concurrent: None,
            min_interval_ms: None,
        }
    }

    /// The limiter for this provider, if it is paced at all.
    ///
    /// Ollama is limited to one call at a time with a 500ms gap unless
    /// configured otherwise.
    pub fn limiter(&self) -> Option<CallLimiter> {
        let (default_concurrent, default_interval) = match self.kind {
            ProviderConfig::Ollama { .. } => (Some(1), Some(500)),
            _ => (None, None),
        };
        let max_concurrent = self.max_concurrent.or(default_concurrent);
        let min_interval_ms = self.min_interval_ms.or(default_interval);

        if max_concurrent.is_none() && min_interval_ms.is_none() {
            return None;
        }
        Some(CallLimiter::new(
            max_concurrent
                .unwrap_or(tokio::sync::Semaphore::MAX_PERMITS)
                .max(1),
            Duration::from_millis(min_interval_ms.unwrap_or(0)),
        ))
    }
}

/// Top-level choicebench configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,
    /// Models to evaluate, in reporting order.
    #[serde(default = "default_models")]
    pub models: Vec<ModelConfig>,
    /// System instruction sent ahead of every question.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Attempts per (question, model) pair.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Deadline for a single attempt. 0 disables it.
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,
    /// Max concurrent (question, model) pairs.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Name recorded in report metadata.
    #[serde(default)]
    pub evaluator: Option<String>,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_attempt_timeout() -> u64 {
    120
}
fn default_parallelism() -> usize {
    1
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./choicebench-results")
}

/// The reference line-up evaluated when no `[[models]]` are configured.
pub fn default_models() -> Vec<ModelConfig> {
    vec![
        // Reasoning model: rejects an explicit temperature
        ModelConfig::new("o3-mini-2025-01-31", Vendor::OpenAi),
        ModelConfig::new("gpt-4o-2024-11-20", Vendor::OpenAi).with_temperature(0.0),
        ModelConfig::new("claude-3-5-sonnet-20241022", Vendor::Anthropic).with_temperature(0.0),
        ModelConfig::new("claude-3-5-haiku-20241022", Vendor::Anthropic).with_temperature(0.0),
        ModelConfig::new("gemini-2.0-flash-001", Vendor::Gemini).with_temperature(0.0),
        ModelConfig::new("llama3.2:3b", Vendor::Ollama).with_temperature(0.0),
        ModelConfig::new("gemma2:9b", Vendor::Ollama).with_temperature(0.0),
    ]
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            models: default_models(),
            system_prompt: None,
            max_attempts: default_max_attempts(),
            attempt_timeout_secs: default_attempt_timeout(),
            parallelism: default_parallelism(),
            output_dir: default_output_dir(),
            evaluator: None,
        }
    }
}

impl BenchConfig {
    /// Engine settings derived from this config.
    pub fn engine_config(&self) -> EvalEngineConfig {
        EvalEngineConfig {
            parallelism: self.parallelism.max(1),
            max_attempts: self.max_attempts.max(1),
            attempt_timeout: (self.attempt_timeout_secs > 0)
                .then(|| Duration::from_secs(self.attempt_timeout_secs)),
            system_prompt: self
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }

    /// The provider entry serving `vendor`, if one is configured.
    pub fn provider_for(&self, vendor: Vendor) -> Option<&ProviderSettings> {
        let mut names: Vec<&String> = self.providers.keys().collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|name| self.providers.get(name))
            .find(|p| p.kind.vendor() == vendor)
    }

    fn provider_for_mut(&mut self, vendor: Vendor) -> &mut ProviderSettings {
        let existing = {
            let mut names: Vec<&String> = self.providers.keys().collect();
            names.sort();
            names
                .into_iter()
                .find(|name| self.providers[*name].kind.vendor() == vendor)
                .cloned()
        };
        let name = existing.unwrap_or_else(|| vendor.to_string());
        self.providers
            .entry(name)
            .or_insert_with(|| ProviderSettings::new(ProviderConfig::empty(vendor)))
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are inserted verbatim and never rescanned.
fn resolve_env_vars(s: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        result.push_str(&lookup(&rest[start + 2..start + end]).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(
    config: &ProviderConfig,
    lookup: &impl Fn(&str) -> Option<String>,
) -> ProviderConfig {
    let opt = |v: &Option<String>| v.as_ref().map(|u| resolve_env_vars(u, lookup));
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key, lookup),
            base_url: opt(base_url),
            org_id: opt(org_id),
        },
        ProviderConfig::Anthropic { api_key, base_url } => ProviderConfig::Anthropic {
            api_key: resolve_env_vars(api_key, lookup),
            base_url: opt(base_url),
        },
        ProviderConfig::Gemini { api_key, base_url } => ProviderConfig::Gemini {
            api_key: resolve_env_vars(api_key, lookup),
            base_url: opt(base_url),
        },
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url, lookup),
        },
    }
}

/// Apply `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `GOOGLE_API_KEY` and
/// `OLLAMA_HOST`, then resolve `${VAR}` references.
fn apply_env(config: &mut BenchConfig, lookup: impl Fn(&str) -> Option<String>) {
    for (var, vendor) in [
        ("OPENAI_API_KEY", Vendor::OpenAi),
        ("ANTHROPIC_API_KEY", Vendor::Anthropic),
        ("GOOGLE_API_KEY", Vendor::Gemini),
    ] {
        let Some(key) = lookup(var).filter(|k| !k.is_empty()) else {
            continue;
        };
        match &mut config.provider_for_mut(vendor).kind {
            ProviderConfig::OpenAI { api_key, .. }
            | ProviderConfig::Anthropic { api_key, .. }
            | ProviderConfig::Gemini { api_key, .. } => *api_key = key,
            ProviderConfig::Ollama { .. } => {}
        }
    }

    if let Some(host) = lookup("OLLAMA_HOST").filter(|h| !h.is_empty()) {
        let host = if host.contains("://") {
            host
        } else {
            format!("http://{host}")
        };
        if let ProviderConfig::Ollama { base_url } = &mut config.provider_for_mut(Vendor::Ollama).kind {
            *base_url = host;
        }
    }

    for settings in config.providers.values_mut() {
        settings.kind = resolve_provider_config(&settings.kind, &lookup);
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `choicebench.toml` in the current directory
/// 2. `~/.config/choicebench/config.toml`
///
/// Environment variable overrides: `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`,
/// `GOOGLE_API_KEY`, `OLLAMA_HOST`.
pub fn load_config() -> Result<BenchConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<BenchConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("choicebench.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => BenchConfig::default(),
    };

    apply_env(&mut config, |var| std::env::var(var).ok());
    Ok(config)
}

/// Parse a config document without touching the environment.
pub fn parse_config(content: &str) -> Result<BenchConfig> {
    Ok(toml::from_str::<BenchConfig>(content)?)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("choicebench"))
}

/// Create a backend instance from its configuration.
pub fn create_backend(config: &ProviderConfig) -> Result<Arc<dyn Backend>> {
    let backend: Arc<dyn Backend> = match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Arc::new(OpenAiBackend::new(api_key, base_url.clone(), org_id.clone())?),
        ProviderConfig::Anthropic { api_key, base_url } => {
            Arc::new(AnthropicBackend::new(api_key, base_url.clone())?)
        }
        ProviderConfig::Gemini { api_key, base_url } => {
            Arc::new(GeminiBackend::new(api_key, base_url.clone())?)
        }
        ProviderConfig::Ollama { base_url } => Arc::new(OllamaBackend::new(base_url)?),
    };
    Ok(backend)
}

fn key_hint(vendor: Vendor) -> &'static str {
    match vendor {
        Vendor::OpenAi => "OPENAI_API_KEY",
        Vendor::Anthropic => "ANTHROPIC_API_KEY",
        Vendor::Gemini => "GOOGLE_API_KEY",
        Vendor::Ollama => "OLLAMA_HOST",
    }
}

/// Build the registry serving every vendor that `models` use.
///
/// A local Ollama server is assumed when none is configured; hosted vendors
/// must have a provider entry or an API key in the environment.
pub fn build_registry(config: &BenchConfig, models: &[ModelConfig]) -> Result<BackendRegistry> {
    let mut vendors: Vec<Vendor> = models.iter().map(|m| m.vendor).collect();
    vendors.sort();
    vendors.dedup();

    let mut registry = BackendRegistry::new();
    for vendor in vendors {
        let settings = match config.provider_for(vendor) {
            Some(settings) => settings.clone(),
            None if vendor == Vendor::Ollama => {
                ProviderSettings::new(ProviderConfig::empty(Vendor::Ollama))
            }
            None => anyhow::bail!(
                "no provider configured for {vendor}. Add [providers.{vendor}] to choicebench.toml or set {}",
                key_hint(vendor)
            ),
        };

        let backend = create_backend(&settings.kind)
            .with_context(|| format!("failed to create {vendor} backend"))?;
        info!(%vendor, paced = settings.limiter().is_some(), "registered backend");
        registry.register(backend, settings.limiter());
    }
    Ok(registry)
}
