//! Core trait definitions for model backends.
//!
//! Implemented by the `choicebench-providers` crate, one type per vendor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{ModelConfig, Vendor};

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// A model backend that answers a rendered prompt with free-form text.
///
/// Implementations own their credentials and HTTP client, translate the
/// request into the vendor's shape, and return the trimmed reply text.
/// Transport failures are returned as `Err`; the engine turns them into
/// an error sentinel on the attempt.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Which vendor this backend serves.
    fn vendor(&self) -> Vendor;

    /// Send one request and return the reply text.
    async fn invoke(&self, config: &ModelConfig, request: &PromptRequest)
        -> anyhow::Result<String>;
}

/// A fully rendered request for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRequest {
    /// System instruction.
    pub system_prompt: String,
    /// Rendered question prompt.
    pub user_prompt: String,
}

// ---------------------------------------------------------------------------
// Backend reply
// ---------------------------------------------------------------------------

/// What an attempt received from the backend layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Reply text from the backend.
    Text(String),
    /// Transport failure, timeout, or malformed response, as a sentinel string.
    Failed(String),
}

impl Reply {
    /// Build the sentinel for a transport-level failure.
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Reply::Failed(format!("[Error: {message}]"))
    }

    /// The text recorded in the attempt audit trail.
    pub fn raw_text(&self) -> &str {
        match self {
            Reply::Text(text) | Reply::Failed(text) => text,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Reply::Failed(_))
    }
}
