use serde_json::Value;

pub const CHAT_CHUNK: &str = "chat:chunk";
pub const CHAT_STATE: &str = "chat:state";
pub const CHAT_DONE: &str = "chat:done";

pub trait EmitterPort: Send + Sync {
    fn emit(&self, channel: &str, payload: &Value);
}

/// Discards every event.
pub struct SilentEmitter;

impl EmitterPort for SilentEmitter {
    fn emit(&self, _channel: &str, _payload: &Value) {}
}
