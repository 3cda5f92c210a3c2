pub mod providers;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::core::ports::llm::{DynError, GenerationPort, GenerationRequest};

pub const GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 text, sent as-is.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<InlineImage>,
}

#[derive(Debug)]
pub enum StreamEvent {
    Text(String),
    Usage(TokenUsage),
    Done,
    Error(String),
}

/// Token counters reported with a streamed reply, logged at debug.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

impl TokenUsage {
    pub fn is_empty(&self) -> bool {
        self.input_tokens.is_none() && self.output_tokens.is_none() && self.total_tokens.is_none()
    }
}

/// Gemini REST adapter for the generation port.
pub struct GeminiAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        Self::new(GOOGLE_API_BASE)
    }
}

impl GeminiAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl GenerationPort for GeminiAdapter {
    fn chat_stream<'a>(
        &'a self,
        request: &'a GenerationRequest,
        tx: mpsc::UnboundedSender<StreamEvent>,
    ) -> BoxFuture<'a, Result<(), DynError>> {
        Box::pin(async move {
            providers::google::chat_stream(&self.client, &self.base_url, request, tx).await
        })
    }

    fn complete<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, DynError>> {
        Box::pin(async move {
            providers::google::complete(&self.client, &self.base_url, request).await
        })
    }
}
