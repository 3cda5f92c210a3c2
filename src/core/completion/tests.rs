use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{
    build_request, CompletionOrchestrator, CompletionOutcome, CompletionRun, CompletionSettings,
    CompletionState, FALLBACK_EMPTY_REPLY,
};
use crate::core::conversation::{Conversation, ConversationStore, ImageAttachment, Message, Role};
use crate::core::error::ChatError;
use crate::core::ports::emitter::{EmitterPort, CHAT_CHUNK, CHAT_DONE, CHAT_STATE};
use crate::core::ports::llm::{DynError, GenerationPort, GenerationRequest, StreamEvent, TurnRole};

#[derive(Default)]
struct ScriptedGeneration {
    fragments: Vec<&'static str>,
    stream_error: Option<&'static str>,
    event_error: Option<&'static str>,
    stall: bool,
    fallback: Option<Result<&'static str, &'static str>>,
    stream_calls: Mutex<Vec<GenerationRequest>>,
    complete_calls: Mutex<usize>,
}

impl GenerationPort for ScriptedGeneration {
    fn chat_stream<'a>(
        &'a self,
        request: &'a GenerationRequest,
        tx: mpsc::UnboundedSender<StreamEvent>,
    ) -> BoxFuture<'a, Result<(), DynError>> {
        Box::pin(async move {
            self.stream_calls
                .lock()
                .expect("stream calls")
                .push(request.clone());
            for fragment in &self.fragments {
                let _ = tx.send(StreamEvent::Text(fragment.to_string()));
            }
            if self.stall {
                std::future::pending::<()>().await;
            }
            if let Some(error) = self.event_error {
                let _ = tx.send(StreamEvent::Error(error.to_string()));
                return Ok(());
            }
            if let Some(error) = self.stream_error {
                return Err(error.into());
            }
            let _ = tx.send(StreamEvent::Done);
            Ok(())
        })
    }

    fn complete<'a>(
        &'a self,
        _request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, DynError>> {
        Box::pin(async move {
            *self.complete_calls.lock().expect("complete calls") += 1;
            match self.fallback {
                Some(Ok(text)) => Ok(text.to_string()),
                Some(Err(error)) => Err(error.into()),
                None => Err("fallback not scripted".into()),
            }
        })
    }
}

#[derive(Default)]
struct RecordingEmitter {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingEmitter {
    fn channel(&self, channel: &str) -> Vec<Value> {
        self.events
            .lock()
            .expect("events")
            .iter()
            .filter(|(name, _)| name == channel)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl EmitterPort for RecordingEmitter {
    fn emit(&self, channel: &str, payload: &Value) {
        self.events
            .lock()
            .expect("events")
            .push((channel.to_string(), payload.clone()));
    }
}

fn settings() -> CompletionSettings {
    CompletionSettings {
        api_key: Some("test-key".to_string()),
        response_timeout: Duration::from_millis(200),
        ..CompletionSettings::default()
    }
}

fn pending_user_turn() -> Conversation {
    let mut store = ConversationStore::new();
    store
        .current_mut()
        .append(Message::user("Is this mole dangerous?"))
        .expect("append");
    store.current().clone()
}

fn orchestrator(
    generation: ScriptedGeneration,
) -> (CompletionOrchestrator, Arc<ScriptedGeneration>, Arc<RecordingEmitter>) {
    let generation = Arc::new(generation);
    let emitter = Arc::new(RecordingEmitter::default());
    (
        CompletionOrchestrator::new(generation.clone(), emitter.clone()),
        generation,
        emitter,
    )
}

#[tokio::test]
async fn streamed_fragments_are_joined_and_published() {
    let (orchestrator, generation, emitter) = orchestrator(ScriptedGeneration {
        fragments: vec!["Hel", "lo"],
        ..Default::default()
    });
    let mut conversation = pending_user_turn();

    let outcome = orchestrator
        .maybe_complete(&mut conversation, &settings())
        .await
        .expect("complete");

    assert_eq!(
        outcome,
        CompletionOutcome::Finished {
            state: CompletionState::Done,
            content: "Hello".to_string(),
        }
    );
    let last = conversation.messages().last().expect("reply");
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.content, "Hello");

    let deltas: Vec<Value> = emitter
        .channel(CHAT_CHUNK)
        .into_iter()
        .map(|payload| payload["delta"].clone())
        .collect();
    assert_eq!(deltas, vec![Value::from("Hel"), Value::from("lo")]);
    assert_eq!(emitter.channel(CHAT_DONE).len(), 1);
    assert_eq!(*generation.complete_calls.lock().expect("calls"), 0);
}

#[tokio::test]
async fn finished_reply_is_trimmed() {
    let (orchestrator, _, _) = orchestrator(ScriptedGeneration {
        fragments: vec!["  Apply ", "sunscreen.\n"],
        ..Default::default()
    });
    let mut conversation = pending_user_turn();
    orchestrator
        .maybe_complete(&mut conversation, &settings())
        .await
        .expect("complete");
    assert_eq!(
        conversation.messages().last().map(|m| m.content.as_str()),
        Some("Apply sunscreen.")
    );
}

#[tokio::test]
async fn idle_when_last_message_is_not_user() {
    let (orchestrator, generation, emitter) = orchestrator(ScriptedGeneration::default());
    let mut conversation = pending_user_turn();
    conversation
        .append(Message::assistant("Already answered."))
        .expect("append");
    let before = conversation.messages().to_vec();

    let outcome = orchestrator
        .maybe_complete(&mut conversation, &settings())
        .await
        .expect("complete");

    assert_eq!(outcome, CompletionOutcome::Idle);
    assert_eq!(conversation.messages(), before.as_slice());
    assert!(generation.stream_calls.lock().expect("calls").is_empty());
    assert!(emitter.events.lock().expect("events").is_empty());
}

#[tokio::test]
async fn missing_credential_leaves_conversation_untouched() {
    let (orchestrator, generation, _) = orchestrator(ScriptedGeneration::default());
    let mut conversation = pending_user_turn();
    let before = conversation.messages().len();

    let outcome = orchestrator
        .maybe_complete(
            &mut conversation,
            &CompletionSettings {
                api_key: Some("   ".to_string()),
                ..settings()
            },
        )
        .await
        .expect("complete");

    assert_eq!(outcome, CompletionOutcome::NotConfigured);
    assert_eq!(conversation.messages().len(), before);
    assert!(generation.stream_calls.lock().expect("calls").is_empty());
}

#[tokio::test]
async fn second_call_does_not_append_another_reply() {
    let (orchestrator, generation, _) = orchestrator(ScriptedGeneration {
        fragments: vec!["Once"],
        ..Default::default()
    });
    let mut conversation = pending_user_turn();

    orchestrator
        .maybe_complete(&mut conversation, &settings())
        .await
        .expect("first");
    let outcome = orchestrator
        .maybe_complete(&mut conversation, &settings())
        .await
        .expect("second");

    assert_eq!(outcome, CompletionOutcome::Idle);
    assert_eq!(conversation.messages().len(), 3);
    assert_eq!(generation.stream_calls.lock().expect("calls").len(), 1);
}

#[tokio::test]
async fn stream_error_falls_back_and_replaces_partial_text() {
    let (orchestrator, generation, emitter) = orchestrator(ScriptedGeneration {
        fragments: vec!["partial"],
        stream_error: Some("connection reset"),
        fallback: Some(Ok("Full answer.")),
        ..Default::default()
    });
    let mut conversation = pending_user_turn();

    let outcome = orchestrator
        .maybe_complete(&mut conversation, &settings())
        .await
        .expect("complete");

    assert_eq!(
        outcome,
        CompletionOutcome::Finished {
            state: CompletionState::Done,
            content: "Full answer.".to_string(),
        }
    );
    assert_eq!(*generation.complete_calls.lock().expect("calls"), 1);
    let states: Vec<Value> = emitter
        .channel(CHAT_STATE)
        .into_iter()
        .map(|payload| payload["state"].clone())
        .collect();
    assert_eq!(
        states,
        vec![
            Value::from("streaming"),
            Value::from("falling_back"),
            Value::from("done")
        ]
    );
}

#[tokio::test]
async fn error_event_triggers_fallback() {
    let (orchestrator, _, _) = orchestrator(ScriptedGeneration {
        event_error: Some("quota exceeded"),
        fallback: Some(Ok("")),
        ..Default::default()
    });
    let mut conversation = pending_user_turn();

    let outcome = orchestrator
        .maybe_complete(&mut conversation, &settings())
        .await
        .expect("complete");

    assert_eq!(
        outcome,
        CompletionOutcome::Finished {
            state: CompletionState::Done,
            content: FALLBACK_EMPTY_REPLY.to_string(),
        }
    );
}

#[tokio::test]
async fn stalled_stream_times_out_into_fallback() {
    let (orchestrator, generation, _) = orchestrator(ScriptedGeneration {
        stall: true,
        fallback: Some(Ok("Recovered.")),
        ..Default::default()
    });
    let mut conversation = pending_user_turn();

    let outcome = orchestrator
        .maybe_complete(
            &mut conversation,
            &CompletionSettings {
                response_timeout: Duration::from_millis(20),
                ..settings()
            },
        )
        .await
        .expect("complete");

    assert_eq!(
        outcome,
        CompletionOutcome::Finished {
            state: CompletionState::Done,
            content: "Recovered.".to_string(),
        }
    );
    assert_eq!(*generation.complete_calls.lock().expect("calls"), 1);
}

#[tokio::test]
async fn double_failure_becomes_error_reply() {
    let long_error: &'static str = Box::leak("x".repeat(150).into_boxed_str());
    let (orchestrator, _, _) = orchestrator(ScriptedGeneration {
        stream_error: Some("stream broke"),
        fallback: Some(Err(long_error)),
        ..Default::default()
    });
    let mut conversation = pending_user_turn();

    let outcome = orchestrator
        .maybe_complete(&mut conversation, &settings())
        .await
        .expect("failures stay in the reply");

    let expected = format!("Error: {}", "x".repeat(100));
    assert_eq!(
        outcome,
        CompletionOutcome::Finished {
            state: CompletionState::Failed,
            content: expected.clone(),
        }
    );
    assert_eq!(
        conversation.messages().last().map(|m| m.content.clone()),
        Some(expected)
    );
}

#[tokio::test]
async fn request_excludes_placeholder_and_moves_instruction_out_of_band() {
    let (orchestrator, generation, _) = orchestrator(ScriptedGeneration {
        fragments: vec!["ok"],
        ..Default::default()
    });
    let mut conversation = pending_user_turn();
    conversation.set_instruction("You are a dermatology assistant.");

    orchestrator
        .maybe_complete(&mut conversation, &settings())
        .await
        .expect("complete");

    let calls = generation.stream_calls.lock().expect("calls");
    let request = &calls[0];
    assert_eq!(
        request.instruction.as_deref(),
        Some("You are a dermatology assistant.")
    );
    assert_eq!(request.turns.len(), 1);
    assert_eq!(request.turns[0].role, TurnRole::User);
    assert_eq!(request.api_key, "test-key");
}

#[test]
fn images_are_only_sent_with_user_turns() {
    let mut conversation = Conversation::new("c".to_string(), "sys", 0);
    let image = ImageAttachment::from_bytes(b"png", "image/png");
    conversation
        .append(Message::user("look").with_image(image.clone()))
        .expect("user");
    conversation
        .append(Message::assistant("seen").with_image(image))
        .expect("assistant");

    let request = build_request(&conversation, None, &settings(), "k");
    assert_eq!(request.turns.len(), 2);
    assert_eq!(
        request.turns[0].image.as_ref().map(|i| i.mime_type.as_str()),
        Some("image/png")
    );
    assert!(request.turns[1].image.is_none());
    assert_eq!(request.turns[1].role, TurnRole::Model);
}

#[test]
fn run_transitions_are_enforced() {
    let mut conversation = pending_user_turn();
    let mut run = CompletionRun::begin(&mut conversation).expect("pending user turn");
    assert_eq!(run.state(), CompletionState::Streaming);
    assert_eq!(conversation.messages()[run.index()].content, "");

    run.push_fragment(&mut conversation, "a").expect("fragment");
    assert!(matches!(
        run.fallback_succeeded(&mut conversation, "b"),
        Err(ChatError::InvalidOperation(_))
    ));

    run.stream_failed().expect("to fallback");
    assert_eq!(run.state(), CompletionState::FallingBack);
    assert!(run.push_fragment(&mut conversation, "late").is_err());
    assert!(run.stream_finished().is_err());

    run.fallback_failed(&mut conversation, "boom").expect("to failed");
    assert_eq!(run.state(), CompletionState::Failed);
    assert_eq!(run.fragments(), 1);
    assert_eq!(run.finish(&mut conversation).expect("finish"), "Error: boom");
}

#[test]
fn unfinished_run_cannot_finish() {
    let mut conversation = pending_user_turn();
    let run = CompletionRun::begin(&mut conversation).expect("pending user turn");
    assert!(run.finish(&mut conversation).is_err());
    assert!(CompletionRun::begin(&mut conversation).is_none());
}
