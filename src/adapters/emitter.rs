use std::io::Write;
use std::sync::Mutex;

use serde_json::Value;

use crate::core::completion::CompletionState;
use crate::core::ports::emitter::{EmitterPort, CHAT_CHUNK, CHAT_DONE, CHAT_STATE};

struct Output<W> {
    writer: W,
    // Set when streaming broke; the final reply is then printed whole.
    replaying: bool,
}

/// Prints streamed reply fragments as they arrive. State changes go to the log.
pub struct TerminalEmitter<W: Write + Send> {
    out: Mutex<Output<W>>,
}

impl TerminalEmitter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: Mutex::new(Output {
                writer,
                replaying: false,
            }),
        }
    }
}

impl<W: Write> Output<W> {
    fn print(&mut self, text: &str) {
        let _ = self.writer.write_all(text.as_bytes());
        let _ = self.writer.flush();
    }
}

impl<W: Write + Send> EmitterPort for TerminalEmitter<W> {
    fn emit(&self, channel: &str, payload: &Value) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        match channel {
            CHAT_CHUNK => {
                if let Some(delta) = payload.get("delta").and_then(Value::as_str) {
                    out.print(delta);
                }
            }
            CHAT_STATE => {
                log::debug!("completion state: {}", payload);
                let falling_back = payload.get("state").and_then(Value::as_str)
                    == Some(CompletionState::FallingBack.as_str());
                if falling_back && !out.replaying {
                    out.replaying = true;
                    out.print("\n");
                }
            }
            CHAT_DONE => {
                if out.replaying {
                    out.replaying = false;
                    let content = payload
                        .get("content")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    out.print(&content);
                }
                out.print("\n");
            }
            other => log::trace!("{}: {}", other, payload),
        }
    }
}
