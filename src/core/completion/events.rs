use serde_json::{json, Value};

use crate::core::ports::emitter::{EmitterPort, CHAT_CHUNK, CHAT_DONE, CHAT_STATE};

use super::state::CompletionState;

pub(super) fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(super) fn emit_state(
    emitter: &dyn EmitterPort,
    conversation_id: &str,
    state: CompletionState,
    reason: Option<&str>,
) -> Value {
    let mut payload = serde_json::Map::new();
    payload.insert("conversation_id".to_string(), json!(conversation_id));
    payload.insert("state".to_string(), json!(state.as_str()));
    payload.insert("ts".to_string(), json!(now_iso()));
    if let Some(reason) = reason {
        payload.insert("reason".to_string(), json!(reason));
    }

    let value = Value::Object(payload);
    emitter.emit(CHAT_STATE, &value);
    value
}

pub(super) fn emit_chunk(emitter: &dyn EmitterPort, conversation_id: &str, index: usize, delta: &str) {
    emitter.emit(
        CHAT_CHUNK,
        &json!({
            "conversation_id": conversation_id,
            "index": index,
            "delta": delta,
        }),
    );
}

pub(super) fn emit_done(
    emitter: &dyn EmitterPort,
    conversation_id: &str,
    state: CompletionState,
    content: &str,
) {
    emitter.emit(
        CHAT_DONE,
        &json!({
            "conversation_id": conversation_id,
            "state": state.as_str(),
            "content": content,
            "ts": now_iso(),
        }),
    );
}
