mod events;
pub mod run;
pub mod state;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use crate::core::ports::{emitter::EmitterPort, llm::GenerationPort};

pub use run::{build_request, CompletionRun, FALLBACK_EMPTY_REPLY};
pub use state::CompletionState;

/// Per-call generation parameters, resolved from settings by the caller.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub response_timeout: Duration,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-pro".to_string(),
            temperature: 1.0,
            max_output_tokens: 2048,
            response_timeout: Duration::from_millis(180_000),
        }
    }
}

impl CompletionSettings {
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The last message is not a user turn; nothing to answer.
    Idle,
    /// No credential configured; the conversation is untouched.
    NotConfigured,
    Finished {
        state: CompletionState,
        content: String,
    },
}

pub struct CompletionOrchestrator {
    pub(crate) llm: Arc<dyn GenerationPort>,
    pub(crate) emitter: Arc<dyn EmitterPort>,
}

impl CompletionOrchestrator {
    pub fn new(llm: Arc<dyn GenerationPort>, emitter: Arc<dyn EmitterPort>) -> Self {
        Self { llm, emitter }
    }
}
