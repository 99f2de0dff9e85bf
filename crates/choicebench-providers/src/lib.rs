//! choicebench-providers: model backend integrations.
//!
//! Implements the `Backend` trait for OpenAI, Anthropic, Gemini, and Ollama,
//! plus the configuration file and the factory that turns it into a
//! backend registry.

pub mod anthropic;
pub mod config;
pub mod error;
pub mod gemini;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use config::{
    build_registry, create_backend, load_config, load_config_from, BenchConfig, ProviderConfig,
    ProviderSettings,
};
pub use error::ProviderError;
