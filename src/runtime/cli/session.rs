use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::config::Settings;
use crate::core::analysis::{analyze_user_message, match_text};
use crate::core::completion::{CompletionOrchestrator, CompletionOutcome, CompletionState};
use crate::core::conversation::{
    apply_quick_prompt, transfer, ConversationStore, ImageAttachment, Message, QuickPrompt, Role,
};
use crate::core::ports::classifier::ImageClassifierPort;

use super::commands::{Command, HELP};
use super::render::{render_analysis, render_conversation_list, render_match, render_transcript};

pub const IMAGE_EXTENSIONS: [(&str, &str); 5] = [
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

pub fn image_mime_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

struct PendingImage {
    bytes: Vec<u8>,
    mime: &'static str,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// All state of one interactive chat. Commands run to completion one at a time.
pub struct ChatSession {
    store: ConversationStore,
    settings: Settings,
    settings_path: Option<PathBuf>,
    orchestrator: CompletionOrchestrator,
    classifier: Arc<dyn ImageClassifierPort>,
    pending_image: Option<PendingImage>,
}

impl ChatSession {
    /// `settings_path` of `None` keeps setting changes in memory only.
    pub fn new(
        settings: Settings,
        settings_path: Option<PathBuf>,
        orchestrator: CompletionOrchestrator,
        classifier: Arc<dyn ImageClassifierPort>,
    ) -> Self {
        let store = ConversationStore::with_instruction(&settings.system_prompt());
        Self {
            store,
            settings,
            settings_path,
            orchestrator,
            classifier,
            pending_image: None,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn persist_settings(&self) -> Result<(), String> {
        match &self.settings_path {
            Some(path) => self.settings.save_to(path).map_err(|e| e.to_string()),
            None => Ok(()),
        }
    }

    pub async fn execute(&mut self, command: Command) -> Result<Reply, String> {
        let text = match command {
            Command::Send(text) => self.send(&text)?,
            Command::New => self.new_conversation(),
            Command::List(query) => {
                let listed = self.store.list(query.as_deref());
                render_conversation_list(&listed, self.store.current_id())
            }
            Command::Open(id) => {
                self.store.select(&id).map_err(|e| e.to_string())?;
                render_transcript(self.store.current())
            }
            Command::Delete(id) => {
                self.store.delete(&id).map_err(|e| e.to_string())?;
                format!(
                    "Deleted {id}. Current conversation: {}",
                    self.store.current_id()
                )
            }
            Command::Show => render_transcript(self.store.current()),
            Command::Edit { index, text } => {
                self.store
                    .current_mut()
                    .edit(index, &text)
                    .map_err(|e| e.to_string())?;
                format!("Message {index} updated.")
            }
            Command::EditRegenerate { index, text } => self.edit_and_regenerate(index, &text)?,
            Command::Remove(index) => {
                let removed = self
                    .store
                    .current_mut()
                    .delete(index)
                    .map_err(|e| e.to_string())?;
                format!("Removed {} message {index}.", removed.role)
            }
            Command::Regenerate(index) => {
                self.store
                    .current_mut()
                    .truncate_for_regenerate(index)
                    .map_err(|e| e.to_string())?;
                format!("Regenerating from message {index}.")
            }
            Command::Reset => {
                let prompt = self.settings.system_prompt();
                self.store.reset_current(Some(&prompt));
                self.pending_image = None;
                "Conversation cleared.".to_string()
            }
            Command::System(text) => {
                self.store.set_system_prompt(&text);
                self.settings.set_system_prompt(&text);
                self.persist_settings()?;
                "System prompt updated.".to_string()
            }
            Command::Export(path) => self.export(&path).await?,
            Command::Import(path) => self.import(&path).await?,
            Command::Attach(path) => self.attach(&path).await?,
            Command::Analyze(text) => render_match(&match_text(&text)),
            Command::Prompt(prompt) => self.quick_prompt(prompt)?,
            Command::Model(model) => {
                self.settings.set_model(&model)?;
                self.persist_settings()?;
                format!("Model set to {}.", self.settings.model())
            }
            Command::Temperature(value) => {
                self.settings.set_temperature(value)?;
                self.persist_settings()?;
                format!("Temperature set to {}.", self.settings.temperature())
            }
            Command::MaxTokens(value) => {
                self.settings.set_max_tokens(value);
                self.persist_settings()?;
                format!("Max tokens set to {}.", self.settings.max_tokens())
            }
            Command::Key(key) => {
                self.settings.set_api_key(&key);
                self.persist_settings()?;
                "API key saved.".to_string()
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Reply::Quit),
        };
        Ok(Reply::Text(text))
    }

    /// Gives the orchestrator the chance to answer a pending user turn.
    /// Returns a notice worth showing, if any.
    pub async fn complete_pending(&mut self) -> Result<Option<String>, String> {
        let completion = self.settings.completion_settings();
        let outcome = self
            .orchestrator
            .maybe_complete(self.store.current_mut(), &completion)
            .await
            .map_err(|e| e.to_string())?;

        Ok(match outcome {
            CompletionOutcome::Idle => None,
            CompletionOutcome::NotConfigured => Some(
                "No API key configured. Set GEMINI_API_KEY or use /key <api key>.".to_string(),
            ),
            CompletionOutcome::Finished {
                state: CompletionState::Failed,
                ..
            } => Some("The model could not be reached; the error was saved as the reply.".to_string()),
            CompletionOutcome::Finished { .. } => None,
        })
    }

    fn send(&mut self, text: &str) -> Result<String, String> {
        let pending = self.pending_image.take();
        let analysis = analyze_user_message(
            text,
            pending.as_ref().map(|image| image.bytes.as_slice()),
            self.classifier.as_ref(),
        );

        let mut message = Message::user(text).with_analysis(analysis);
        if let Some(image) = pending {
            message = message.with_image(ImageAttachment::from_bytes(&image.bytes, image.mime));
        }
        self.store
            .current_mut()
            .append(message)
            .map_err(|e| e.to_string())?;

        let current = self.store.current();
        let mut out = String::new();
        if let Some(analysis) = current.messages().last().and_then(|m| m.analysis.as_ref()) {
            out.push_str(&render_analysis(analysis));
        }
        Ok(out)
    }

    fn new_conversation(&mut self) -> String {
        let id = self
            .store
            .create_with_instruction(&self.settings.system_prompt());
        self.pending_image = None;
        match self.store.select(&id) {
            Ok(()) => format!("Started conversation {id}."),
            Err(e) => e.to_string(),
        }
    }

    fn edit_and_regenerate(&mut self, index: usize, text: &str) -> Result<String, String> {
        let conversation = self.store.current_mut();
        let role = conversation
            .messages()
            .get(index)
            .map(|message| message.role)
            .ok_or_else(|| format!("No message {index} in this conversation"))?;
        if role != Role::User {
            return Err("Only user messages can be edited and regenerated".to_string());
        }
        conversation
            .edit_and_truncate(index, text)
            .map_err(|e| e.to_string())?;
        Ok(format!("Message {index} updated; later messages removed."))
    }

    fn quick_prompt(&mut self, prompt: QuickPrompt) -> Result<String, String> {
        apply_quick_prompt(self.store.current_mut(), prompt).map_err(|e| e.to_string())?;
        Ok(format!("> {}", prompt.text()))
    }

    async fn export(&self, path: &Path) -> Result<String, String> {
        let payload = transfer::export_messages(self.store.current()).map_err(|e| e.to_string())?;
        tokio::fs::write(path, payload)
            .await
            .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
        Ok(format!(
            "Exported {} messages to {}.",
            self.store.current().messages().len(),
            path.display()
        ))
    }

    async fn import(&mut self, path: &Path) -> Result<String, String> {
        let payload = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        let count = transfer::import_messages(self.store.current_mut(), &payload)
            .map_err(|e| e.to_string())?;
        Ok(format!("Loaded {count} messages."))
    }

    async fn attach(&mut self, path: &Path) -> Result<String, String> {
        let mime = image_mime_for(path).ok_or_else(|| {
            format!(
                "Unsupported image type. Use one of: {}",
                IMAGE_EXTENSIONS
                    .iter()
                    .map(|(ext, _)| *ext)
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        let size = bytes.len();
        self.pending_image = Some(PendingImage { bytes, mime });
        Ok(format!(
            "Attached {} ({size} bytes). It will be sent with your next message.",
            path.display()
        ))
    }
}
