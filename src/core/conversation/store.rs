use std::cmp::Reverse;
use std::collections::HashMap;

use crate::core::error::ChatError;

use super::{Conversation, DEFAULT_INSTRUCTION};

/// Every conversation of one chat session plus the current selection.
/// Never empty: construction seeds a first conversation and `delete`
/// refuses to remove the last one.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    conversations: HashMap<String, Conversation>,
    current_id: String,
    next_seq: u64,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::with_instruction(DEFAULT_INSTRUCTION)
    }

    pub fn with_instruction(instruction: &str) -> Self {
        let mut store = Self {
            conversations: HashMap::new(),
            current_id: String::new(),
            next_seq: 0,
        };
        let id = store.create_with_instruction(instruction);
        store.current_id = id;
        store
    }

    fn fresh_id(&self) -> String {
        loop {
            let mut candidate = uuid::Uuid::new_v4().simple().to_string();
            candidate.truncate(8);
            if !self.conversations.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    pub fn create(&mut self) -> String {
        self.create_with_instruction(DEFAULT_INSTRUCTION)
    }

    /// Inserts a new conversation without selecting it.
    pub fn create_with_instruction(&mut self, instruction: &str) -> String {
        let id = self.fresh_id();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.conversations
            .insert(id.clone(), Conversation::new(id.clone(), instruction, seq));
        log::debug!("created conversation {}", id);
        id
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn get(&self, id: &str) -> Result<&Conversation, ChatError> {
        self.conversations
            .get(id)
            .ok_or_else(|| ChatError::ConversationNotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut Conversation, ChatError> {
        self.conversations
            .get_mut(id)
            .ok_or_else(|| ChatError::ConversationNotFound(id.to_string()))
    }

    pub fn current_id(&self) -> &str {
        &self.current_id
    }

    pub fn current(&self) -> &Conversation {
        &self.conversations[&self.current_id]
    }

    pub fn current_mut(&mut self) -> &mut Conversation {
        self.conversations
            .get_mut(&self.current_id)
            .expect("current conversation is always present")
    }

    pub fn select(&mut self, id: &str) -> Result<(), ChatError> {
        if !self.conversations.contains_key(id) {
            return Err(ChatError::ConversationNotFound(id.to_string()));
        }
        self.current_id = id.to_string();
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<(), ChatError> {
        if !self.conversations.contains_key(id) {
            return Err(ChatError::ConversationNotFound(id.to_string()));
        }
        if self.conversations.len() <= 1 {
            return Err(ChatError::InvalidOperation(
                "Cannot delete the last remaining conversation".to_string(),
            ));
        }

        self.conversations.remove(id);
        if self.current_id == id {
            let next = self
                .list(None)
                .first()
                .map(|conversation| conversation.id().to_string());
            if let Some(next) = next {
                self.current_id = next;
            }
        }
        log::debug!("deleted conversation {}", id);
        Ok(())
    }

    /// Most recent first; a non-blank `query` keeps conversations whose title
    /// or message text contains it, ignoring case.
    pub fn list(&self, query: Option<&str>) -> Vec<&Conversation> {
        let needle = query
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase);

        let mut conversations: Vec<&Conversation> = self
            .conversations
            .values()
            .filter(|conversation| match needle.as_deref() {
                Some(needle) => conversation.contains_text(needle),
                None => true,
            })
            .collect();
        conversations.sort_by_key(|conversation| {
            Reverse((conversation.created_at(), conversation.seq))
        });
        conversations
    }

    pub fn rename_from_first_message(&mut self, id: &str, text: &str) -> Result<(), ChatError> {
        self.get_mut(id)?.rename_from_first_message(text);
        Ok(())
    }

    pub fn reset_current(&mut self, instruction: Option<&str>) {
        self.current_mut().reset(instruction);
    }

    /// Blank text keeps the current instruction.
    pub fn set_system_prompt(&mut self, text: &str) {
        self.current_mut().set_instruction(text);
    }
}
