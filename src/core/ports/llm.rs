use futures::future::BoxFuture;
use tokio::sync::mpsc;

pub use crate::core::error::DynError;

pub use crate::adapters::llm::{ChatTurn, InlineImage, StreamEvent, TokenUsage, TurnRole};

/// Everything the hosted model needs for one reply. The system message travels
/// out of band as `instruction`; `turns` hold only user and model turns.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub api_key: String,
    pub model: String,
    pub instruction: Option<String>,
    pub turns: Vec<ChatTurn>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

pub trait GenerationPort: Send + Sync {
    /// Pushes `StreamEvent::Text` fragments into `tx` as they arrive and
    /// finishes with `StreamEvent::Done`.
    fn chat_stream<'a>(
        &'a self,
        request: &'a GenerationRequest,
        tx: mpsc::UnboundedSender<StreamEvent>,
    ) -> BoxFuture<'a, Result<(), DynError>>;

    /// Single-shot completion used when streaming fails.
    fn complete<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, DynError>>;
}
