use thiserror::Error;

pub type DynError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Conversation {0} not found")]
    ConversationNotFound(String),

    #[error("Message index {index} is out of range (conversation has {len} messages)")]
    MessageOutOfRange { index: usize, len: usize },

    #[error("{0}")]
    InvalidOperation(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Malformed import: {0}")]
    MalformedImport(String),
}

impl ChatError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ChatError::ConversationNotFound(_) | ChatError::MessageOutOfRange { .. }
        )
    }
}
