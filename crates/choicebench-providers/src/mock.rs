//! Mock backend for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use choicebench_core::model::{ModelConfig, Vendor};
use choicebench_core::traits::{Backend, PromptRequest};

use crate::error::ProviderError;

/// One scripted reply.
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Reply text.
    Text(String),
    /// A network failure with this message.
    Error(String),
}

impl MockReply {
    pub fn text(s: &str) -> Self {
        MockReply::Text(s.to_string())
    }

    pub fn error(s: &str) -> Self {
        MockReply::Error(s.to_string())
    }
}

/// A mock backend for exercising the engine without real API calls.
///
/// Replies are chosen by prompt substring first; otherwise the script is
/// served in order, with the last entry repeating.
pub struct MockBackend {
    vendor: Vendor,
    /// Map of prompt substring → reply.
    responses: HashMap<String, MockReply>,
    /// Replies served in call order when no substring matches.
    script: Vec<MockReply>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<PromptRequest>>,
}

impl MockBackend {
    /// Create a mock that serves `script` in order.
    pub fn scripted(vendor: Vendor, script: Vec<MockReply>) -> Self {
        Self {
            vendor,
            responses: HashMap::new(),
            script,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same text.
    pub fn with_fixed_response(vendor: Vendor, response: &str) -> Self {
        Self::scripted(vendor, vec![MockReply::text(response)])
    }

    /// Add a reply for prompts containing `needle`.
    pub fn with_response(mut self, needle: &str, reply: MockReply) -> Self {
        self.responses.insert(needle.to_string(), reply);
        self
    }

    /// Get the number of calls made to this backend.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get the last request made to this backend.
    pub fn last_request(&self) -> Option<PromptRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn vendor(&self) -> Vendor {
        self.vendor
    }

    async fn invoke(&self, _config: &ModelConfig, request: &PromptRequest) -> anyhow::Result<String> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst) as usize;
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        let reply = self
            .responses
            .iter()
            .find(|(needle, _)| request.user_prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .or_else(|| {
                self.script
                    .get(call.min(self.script.len().saturating_sub(1)))
                    .cloned()
            })
            .unwrap_or_else(|| MockReply::error("mock has no replies"));

        match reply {
            MockReply::Text(text) => Ok(text.trim().to_string()),
            MockReply::Error(message) => Err(ProviderError::NetworkError(message).into()),
        }
    }
}
