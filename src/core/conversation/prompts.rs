use std::str::FromStr;

use crate::core::error::ChatError;

use super::{Conversation, Message};

/// Canned user turns offered as shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickPrompt {
    Explain,
    Summarize,
    Python,
}

impl QuickPrompt {
    pub const ALL: [QuickPrompt; 3] = [
        QuickPrompt::Explain,
        QuickPrompt::Summarize,
        QuickPrompt::Python,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuickPrompt::Explain => "explain",
            QuickPrompt::Summarize => "summarize",
            QuickPrompt::Python => "python",
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            QuickPrompt::Explain => "Please explain the following code I will paste next.",
            QuickPrompt::Summarize => "Summarize your last message in one short paragraph.",
            QuickPrompt::Python => "Write Python code for the following task:",
        }
    }

    /// Title given to a conversation that starts with this prompt.
    pub fn title(self) -> Option<&'static str> {
        match self {
            QuickPrompt::Explain => Some("Explain my code"),
            QuickPrompt::Summarize => None,
            QuickPrompt::Python => Some("Write Python code"),
        }
    }
}

impl FromStr for QuickPrompt {
    type Err = ChatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        QuickPrompt::ALL
            .into_iter()
            .find(|prompt| prompt.as_str() == normalized)
            .ok_or_else(|| {
                ChatError::InvalidOperation(format!(
                    "Unknown quick prompt '{}'. Choose explain, summarize or python",
                    value.trim()
                ))
            })
    }
}

/// Appends the prompt as a user turn. A fresh conversation takes the
/// prompt's title when it has one.
pub fn apply_quick_prompt(conversation: &mut Conversation, prompt: QuickPrompt) -> Result<(), ChatError> {
    let fresh = conversation.visible_message_count() == 0;
    conversation.append(Message::user(prompt.text()))?;
    if let (true, Some(title)) = (fresh, prompt.title()) {
        conversation.set_title(title);
    }
    Ok(())
}
