use serde_json::Value;

use crate::core::error::ChatError;

use super::{Conversation, Message, Role, DEFAULT_INSTRUCTION};

pub fn export_messages(conversation: &Conversation) -> Result<String, ChatError> {
    serde_json::to_string_pretty(conversation.messages())
        .map_err(|e| ChatError::InvalidOperation(format!("Failed to export conversation: {e}")))
}

/// Parses an exported message array. A missing leading system message is
/// supplied; a system message anywhere else is rejected.
pub fn parse_messages(payload: &str) -> Result<Vec<Message>, ChatError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| ChatError::MalformedImport(format!("Failed to load: {e}")))?;

    let Value::Array(items) = value else {
        return Err(ChatError::MalformedImport(
            "Uploaded file must be a JSON list of messages.".to_string(),
        ));
    };

    let mut messages = items
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            serde_json::from_value::<Message>(item).map_err(|e| {
                ChatError::MalformedImport(format!("Message {position} is invalid: {e}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(position) = messages
        .iter()
        .skip(1)
        .position(|message| message.role == Role::System)
    {
        return Err(ChatError::MalformedImport(format!(
            "Message {} is a system message; only the first message may be one",
            position + 1
        )));
    }

    if messages.first().map(|message| message.role) != Some(Role::System) {
        messages.insert(0, Message::system(DEFAULT_INSTRUCTION));
    }

    Ok(messages)
}

/// Replaces the conversation's messages with the payload. On error the
/// conversation is left untouched.
pub fn import_messages(conversation: &mut Conversation, payload: &str) -> Result<usize, ChatError> {
    let messages = parse_messages(payload)?;
    let count = messages.len();
    conversation.replace_messages(messages);
    log::info!(
        "imported {} messages into conversation {}",
        count,
        conversation.id()
    );
    Ok(count)
}
