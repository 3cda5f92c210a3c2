use crate::core::analysis::{care_guide, Analysis, AnalysisScore, Condition, MatchResult};
use crate::core::conversation::{Conversation, Message, Role};

pub fn format_score(score: AnalysisScore) -> String {
    match score {
        AnalysisScore::Matches(count) => format!("{count} keyword match(es)"),
        AnalysisScore::Confidence(confidence) => format!("{:.0}% confidence", confidence * 100.0),
    }
}

pub fn render_care_guide(condition: Condition) -> String {
    let guide = care_guide(condition);
    let mut lines = vec![format!("    Severity: {}", guide.severity)];
    if guide.urgent {
        lines.push("    Please consult a dermatologist promptly.".to_string());
    }
    lines.push("    Treatment options:".to_string());
    lines.extend(guide.treatments.iter().map(|t| format!("      - {t}")));
    lines.join("\n")
}

pub fn render_analysis(analysis: &Analysis) -> String {
    let mut out = format!(
        "  Possible condition: {} ({}), {}",
        analysis.name,
        analysis.condition,
        format_score(analysis.score)
    );
    if !analysis.matched_keywords.is_empty() {
        out.push_str(&format!("\n    Matched: {}", analysis.matched_keywords.join(", ")));
    }
    out.push('\n');
    out.push_str(&render_care_guide(analysis.condition));
    out
}

pub fn render_match(result: &MatchResult) -> String {
    if !result.condition.is_known() {
        return "No skin condition keywords found.".to_string();
    }
    render_analysis(&Analysis::from(result.clone()))
}

fn render_message(index: usize, message: &Message) -> String {
    let mut out = format!("[{index}] {}: {}", message.role, message.content);
    if let Some(image) = &message.image {
        out.push_str(&format!(" [image: {}]", image.mime));
    }
    if message.role == Role::User {
        if let Some(analysis) = &message.analysis {
            out.push('\n');
            out.push_str(&render_analysis(analysis));
        }
    }
    out
}

pub fn render_transcript(conversation: &Conversation) -> String {
    let mut lines = vec![format!(
        "{} ({}), {} message(s)",
        conversation.title(),
        conversation.id(),
        conversation.visible_message_count()
    )];
    lines.extend(
        conversation
            .messages()
            .iter()
            .enumerate()
            .filter(|(_, message)| message.role != Role::System)
            .map(|(index, message)| render_message(index, message)),
    );
    lines.join("\n")
}

pub fn render_conversation_list(conversations: &[&Conversation], current_id: &str) -> String {
    if conversations.is_empty() {
        return "No conversations match.".to_string();
    }
    conversations
        .iter()
        .map(|conversation| {
            let marker = if conversation.id() == current_id { '*' } else { ' ' };
            format!(
                "{marker} {}  {}  ({} messages, {})",
                conversation.id(),
                conversation.title(),
                conversation.visible_message_count(),
                conversation.created_at().format("%Y-%m-%d %H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
