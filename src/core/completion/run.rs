use tokio::sync::mpsc;

use crate::core::conversation::{Conversation, Message, Role};
use crate::core::error::ChatError;
use crate::core::ports::llm::{ChatTurn, GenerationRequest, InlineImage, StreamEvent, TurnRole};

use super::events::{emit_chunk, emit_done, emit_state};
use super::state::CompletionState;
use super::{CompletionOrchestrator, CompletionOutcome, CompletionSettings};

pub const FALLBACK_EMPTY_REPLY: &str = "[No response generated]";
const ERROR_PREVIEW_CHARS: usize = 100;

/// One reply being produced into an assistant placeholder.
///
/// Transitions: `Streaming -> Done`, `Streaming -> FallingBack`,
/// `FallingBack -> Done | Failed`. Anything else is an `InvalidOperation`.
#[derive(Debug)]
pub struct CompletionRun {
    index: usize,
    state: CompletionState,
    fragments: usize,
}

impl CompletionRun {
    /// Appends the empty assistant placeholder when the conversation ends with
    /// a user turn. Returns `None` otherwise.
    pub fn begin(conversation: &mut Conversation) -> Option<Self> {
        if conversation.last_role() != Some(Role::User) {
            return None;
        }
        Some(Self {
            index: conversation.push_placeholder(),
            state: CompletionState::Streaming,
            fragments: 0,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> CompletionState {
        self.state
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    fn slot<'c>(&self, conversation: &'c mut Conversation) -> Result<&'c mut Message, ChatError> {
        let len = conversation.messages().len();
        conversation
            .message_mut(self.index)
            .ok_or(ChatError::MessageOutOfRange {
                index: self.index,
                len,
            })
    }

    fn transition(&mut self, from: CompletionState, to: CompletionState) -> Result<(), ChatError> {
        if self.state != from {
            return Err(ChatError::InvalidOperation(format!(
                "completion cannot move from {} to {}",
                self.state, to
            )));
        }
        self.state = to;
        Ok(())
    }

    pub fn push_fragment(&mut self, conversation: &mut Conversation, text: &str) -> Result<(), ChatError> {
        if self.state != CompletionState::Streaming {
            return Err(ChatError::InvalidOperation(format!(
                "fragment received while {}",
                self.state
            )));
        }
        self.slot(conversation)?.content.push_str(text);
        self.fragments += 1;
        Ok(())
    }

    pub fn stream_finished(&mut self) -> Result<(), ChatError> {
        self.transition(CompletionState::Streaming, CompletionState::Done)
    }

    pub fn stream_failed(&mut self) -> Result<(), ChatError> {
        self.transition(CompletionState::Streaming, CompletionState::FallingBack)
    }

    /// Replaces whatever was streamed with the single-shot reply.
    pub fn fallback_succeeded(&mut self, conversation: &mut Conversation, text: &str) -> Result<(), ChatError> {
        let slot = self.slot(conversation)?;
        self.transition(CompletionState::FallingBack, CompletionState::Done)?;
        slot.content = if text.trim().is_empty() {
            FALLBACK_EMPTY_REPLY.to_string()
        } else {
            text.to_string()
        };
        Ok(())
    }

    pub fn fallback_failed(&mut self, conversation: &mut Conversation, error: &str) -> Result<(), ChatError> {
        let slot = self.slot(conversation)?;
        self.transition(CompletionState::FallingBack, CompletionState::Failed)?;
        let preview: String = error.chars().take(ERROR_PREVIEW_CHARS).collect();
        slot.content = format!("Error: {preview}");
        Ok(())
    }

    /// Trims the final content once and returns it.
    pub fn finish(self, conversation: &mut Conversation) -> Result<String, ChatError> {
        if !self.state.is_terminal() {
            return Err(ChatError::InvalidOperation(format!(
                "completion finished while {}",
                self.state
            )));
        }
        let slot = self.slot(conversation)?;
        let trimmed = slot.content.trim().to_string();
        slot.content = trimmed.clone();
        Ok(trimmed)
    }
}

/// Translates the conversation for the provider. The leading system message
/// becomes the instruction; `exclude` (the placeholder) is skipped; images are
/// sent only with user turns.
pub fn build_request(
    conversation: &Conversation,
    exclude: Option<usize>,
    settings: &CompletionSettings,
    api_key: &str,
) -> GenerationRequest {
    let mut instruction = None;
    let mut turns = Vec::new();

    for (index, message) in conversation.messages().iter().enumerate() {
        if Some(index) == exclude {
            continue;
        }
        let role = match message.role {
            Role::System => {
                instruction = Some(message.content.clone());
                continue;
            }
            Role::User => TurnRole::User,
            Role::Assistant => TurnRole::Model,
        };
        let image = match (role, &message.image) {
            (TurnRole::User, Some(attachment)) => Some(InlineImage {
                mime_type: attachment.mime.clone(),
                data: attachment.data.clone(),
            }),
            _ => None,
        };
        turns.push(ChatTurn {
            role,
            text: message.content.clone(),
            image,
        });
    }

    GenerationRequest {
        api_key: api_key.to_string(),
        model: settings.model.clone(),
        instruction,
        turns,
        temperature: settings.temperature,
        max_output_tokens: settings.max_output_tokens,
    }
}

impl CompletionOrchestrator {
    /// Answers a pending user turn, streaming into a placeholder and falling
    /// back to a single-shot call when the stream breaks. Provider failures
    /// end up as the reply text, not as an `Err`.
    pub async fn maybe_complete(
        &self,
        conversation: &mut Conversation,
        settings: &CompletionSettings,
    ) -> Result<CompletionOutcome, ChatError> {
        if conversation.last_role() != Some(Role::User) {
            return Ok(CompletionOutcome::Idle);
        }
        let Some(api_key) = settings.credential().map(ToOwned::to_owned) else {
            log::warn!("no API key configured; skipping completion");
            return Ok(CompletionOutcome::NotConfigured);
        };
        let Some(mut run) = CompletionRun::begin(conversation) else {
            return Ok(CompletionOutcome::Idle);
        };

        let conversation_id = conversation.id().to_string();
        let request = build_request(conversation, Some(run.index()), settings, &api_key);
        log::info!(
            "completing conversation {} with {} ({} turns)",
            conversation_id,
            request.model,
            request.turns.len()
        );
        emit_state(self.emitter.as_ref(), &conversation_id, run.state(), None);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let llm = self.llm.clone();
        let stream_request = request.clone();
        let llm_handle = tokio::spawn(async move { llm.chat_stream(&stream_request, tx).await });

        let mut failure: Option<String> = None;
        loop {
            let event = match tokio::time::timeout(settings.response_timeout, rx.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(_) => {
                    llm_handle.abort();
                    failure = Some(format!(
                        "llm_response_timeout:{}ms",
                        settings.response_timeout.as_millis()
                    ));
                    break;
                }
            };

            match event {
                StreamEvent::Text(text) => {
                    run.push_fragment(conversation, &text)?;
                    emit_chunk(self.emitter.as_ref(), &conversation_id, run.index(), &text);
                }
                StreamEvent::Usage(usage) => {
                    log::debug!("token usage for {}: {:?}", conversation_id, usage);
                }
                StreamEvent::Done => break,
                StreamEvent::Error(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }

        if failure.is_none() {
            failure = match llm_handle.await {
                Ok(Ok(())) => None,
                Ok(Err(error)) => Some(error.to_string()),
                Err(join_err) => Some(format!("llm_task_join_failed:{join_err}")),
            };
        } else {
            llm_handle.abort();
        }

        match failure {
            None => run.stream_finished()?,
            Some(reason) => {
                log::warn!("streaming failed for {}: {}", conversation_id, reason);
                run.stream_failed()?;
                emit_state(
                    self.emitter.as_ref(),
                    &conversation_id,
                    run.state(),
                    Some(&reason),
                );
                match self.llm.complete(&request).await {
                    Ok(text) => run.fallback_succeeded(conversation, &text)?,
                    Err(error) => {
                        log::warn!("fallback completion failed for {}: {}", conversation_id, error);
                        run.fallback_failed(conversation, &error.to_string())?;
                    }
                }
            }
        }

        let state = run.state();
        let content = run.finish(conversation)?;
        emit_state(self.emitter.as_ref(), &conversation_id, state, None);
        emit_done(self.emitter.as_ref(), &conversation_id, state, &content);
        Ok(CompletionOutcome::Finished { state, content })
    }
}
