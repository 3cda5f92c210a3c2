mod message;
pub mod prompts;
pub mod store;
pub mod transfer;

use chrono::{DateTime, Utc};

use crate::core::error::ChatError;

pub use message::{ImageAttachment, Message, Role};
pub use prompts::{apply_quick_prompt, QuickPrompt};
pub use store::ConversationStore;

pub const DEFAULT_INSTRUCTION: &str = "You are a helpful assistant.";
pub const DEFAULT_TITLE: &str = "New Chat";
pub const TITLE_MAX_CHARS: usize = 40;

pub fn title_from_first_message(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[derive(Debug, Clone)]
pub struct Conversation {
    id: String,
    title: String,
    created_at: DateTime<Utc>,
    pub(crate) seq: u64,
    messages: Vec<Message>,
}

impl Conversation {
    pub(crate) fn new(id: String, instruction: &str, seq: u64) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            created_at: Utc::now(),
            seq,
            messages: vec![Message::system(instruction)],
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_role(&self) -> Option<Role> {
        self.messages.last().map(|message| message.role)
    }

    pub fn visible_message_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.role != Role::System)
            .count()
    }

    pub fn instruction(&self) -> &str {
        self.messages
            .first()
            .map(|message| message.content.as_str())
            .unwrap_or(DEFAULT_INSTRUCTION)
    }

    /// Rewrites the slot-0 system message. Blank text keeps the current one.
    pub fn set_instruction(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        if let Some(system) = self.messages.first_mut() {
            system.content = text.to_string();
        }
    }

    pub fn rename_from_first_message(&mut self, text: &str) {
        self.title = title_from_first_message(text);
    }

    pub(crate) fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// Clears every turn and restores the title.
    pub fn reset(&mut self, instruction: Option<&str>) {
        let instruction = instruction
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_INSTRUCTION);
        self.messages = vec![Message::system(instruction)];
        self.title = DEFAULT_TITLE.to_string();
    }

    pub fn contains_text(&self, needle_lowercase: &str) -> bool {
        if self.title.to_lowercase().contains(needle_lowercase) {
            return true;
        }
        let joined = self
            .messages
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        joined.to_lowercase().contains(needle_lowercase)
    }

    fn check_index(&self, index: usize) -> Result<(), ChatError> {
        if index >= self.messages.len() {
            return Err(ChatError::MessageOutOfRange {
                index,
                len: self.messages.len(),
            });
        }
        Ok(())
    }

    pub fn append(&mut self, message: Message) -> Result<(), ChatError> {
        if message.role == Role::System {
            return Err(ChatError::InvalidOperation(
                "Only the leading message may be a system message".to_string(),
            ));
        }
        let first_turn = self.visible_message_count() == 0;
        let title_source = first_turn.then(|| message.content.clone());
        self.messages.push(message);
        if let Some(text) = title_source {
            self.rename_from_first_message(&text);
        }
        Ok(())
    }

    pub fn edit(&mut self, index: usize, content: &str) -> Result<(), ChatError> {
        self.check_index(index)?;
        self.messages[index].content = content.to_string();
        Ok(())
    }

    pub fn edit_and_truncate(&mut self, index: usize, content: &str) -> Result<(), ChatError> {
        self.edit(index, content)?;
        self.messages.truncate(index + 1);
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> Result<Message, ChatError> {
        self.check_index(index)?;
        if index == 0 {
            return Err(ChatError::InvalidOperation(
                "The system message cannot be deleted".to_string(),
            ));
        }
        Ok(self.messages.remove(index))
    }

    pub fn truncate_for_regenerate(&mut self, index: usize) -> Result<(), ChatError> {
        self.check_index(index)?;
        if self.messages[index].role != Role::Assistant {
            return Err(ChatError::InvalidOperation(format!(
                "Message {index} is not an assistant reply"
            )));
        }
        self.messages.truncate(index);
        Ok(())
    }

    /// Wholesale replacement used by import. Caller validates the shape.
    pub(crate) fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub(crate) fn push_placeholder(&mut self) -> usize {
        self.messages.push(Message::assistant(String::new()));
        self.messages.len() - 1
    }

    pub(crate) fn message_mut(&mut self, index: usize) -> Option<&mut Message> {
        self.messages.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::{title_from_first_message, Conversation, Message, Role, DEFAULT_TITLE};
    use crate::core::error::ChatError;

    fn conversation_with_turns() -> Conversation {
        let mut conversation = Conversation::new("c1".to_string(), "be brief", 0);
        conversation.append(Message::user("u0")).expect("u0");
        conversation.append(Message::assistant("a0")).expect("a0");
        conversation.append(Message::user("u1")).expect("u1");
        conversation.append(Message::assistant("a1")).expect("a1");
        conversation
    }

    fn contents(conversation: &Conversation) -> Vec<(Role, String)> {
        conversation
            .messages()
            .iter()
            .map(|message| (message.role, message.content.clone()))
            .collect()
    }

    #[test]
    fn title_is_truncated_to_forty_chars() {
        assert_eq!(title_from_first_message("short"), "short");
        let exact = "a".repeat(40);
        assert_eq!(title_from_first_message(&exact), exact);
        let long = "b".repeat(41);
        assert_eq!(title_from_first_message(&long), format!("{}...", "b".repeat(40)));
        let wide = "é".repeat(45);
        assert_eq!(title_from_first_message(&wide).chars().count(), 43);
    }

    #[test]
    fn first_turn_derives_title_once() {
        let mut conversation = Conversation::new("c1".to_string(), "sys", 0);
        assert_eq!(conversation.title(), DEFAULT_TITLE);
        conversation.append(Message::user("What is this spot?")).expect("append");
        assert_eq!(conversation.title(), "What is this spot?");
        conversation.append(Message::user("Another question")).expect("append");
        assert_eq!(conversation.title(), "What is this spot?");
    }

    #[test]
    fn append_rejects_second_system_message() {
        let mut conversation = Conversation::new("c1".to_string(), "sys", 0);
        let result = conversation.append(Message::system("again"));
        assert!(matches!(result, Err(ChatError::InvalidOperation(_))));
        assert_eq!(conversation.messages().len(), 1);
    }

    #[test]
    fn edit_keeps_role_and_attachments() {
        let mut conversation = conversation_with_turns();
        conversation.edit(2, "changed").expect("edit");
        assert_eq!(conversation.messages()[2].role, Role::Assistant);
        assert_eq!(conversation.messages()[2].content, "changed");
        assert_eq!(conversation.messages().len(), 5);
    }

    #[test]
    fn edit_out_of_range_is_rejected() {
        let mut conversation = conversation_with_turns();
        let result = conversation.edit(5, "nope");
        assert_eq!(result, Err(ChatError::MessageOutOfRange { index: 5, len: 5 }));
    }

    #[test]
    fn edit_and_truncate_drops_downstream_history() {
        let mut conversation = conversation_with_turns();
        conversation.edit_and_truncate(1, "u0 edited").expect("edit");
        assert_eq!(
            contents(&conversation),
            vec![
                (Role::System, "be brief".to_string()),
                (Role::User, "u0 edited".to_string()),
            ]
        );
    }

    #[test]
    fn delete_does_not_cascade() {
        let mut conversation = conversation_with_turns();
        let removed = conversation.delete(2).expect("delete");
        assert_eq!(removed.content, "a0");
        assert_eq!(
            contents(&conversation)
                .into_iter()
                .map(|(_, content)| content)
                .collect::<Vec<_>>(),
            vec!["be brief", "u0", "u1", "a1"]
        );
    }

    #[test]
    fn delete_guards_system_slot_and_range() {
        let mut conversation = conversation_with_turns();
        assert!(matches!(
            conversation.delete(0),
            Err(ChatError::InvalidOperation(_))
        ));
        assert!(conversation.delete(9).is_err_and(|error| error.is_not_found()));
        assert_eq!(conversation.messages().len(), 5);
    }

    #[test]
    fn truncate_for_regenerate_removes_reply_onwards() {
        let mut conversation = conversation_with_turns();
        conversation.truncate_for_regenerate(4).expect("regenerate");
        assert_eq!(conversation.messages().len(), 4);
        assert_eq!(conversation.last_role(), Some(Role::User));
    }

    #[test]
    fn truncate_for_regenerate_requires_assistant_message() {
        let mut conversation = conversation_with_turns();
        let result = conversation.truncate_for_regenerate(3);
        assert!(matches!(result, Err(ChatError::InvalidOperation(_))));
        assert_eq!(conversation.messages().len(), 5);
    }

    #[test]
    fn reset_restores_title_and_instruction() {
        let mut conversation = conversation_with_turns();
        conversation.reset(Some("  "));
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.instruction(), super::DEFAULT_INSTRUCTION);
        assert_eq!(conversation.title(), DEFAULT_TITLE);
    }

    #[test]
    fn search_covers_title_and_contents() {
        let conversation = conversation_with_turns();
        assert!(conversation.contains_text("u0"));
        assert!(conversation.contains_text("brief"));
        assert!(!conversation.contains_text("melanoma"));
    }
}
