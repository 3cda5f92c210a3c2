use crate::adapters::llm::{ChatTurn, StreamEvent, TokenUsage, TurnRole};
use crate::core::error::ChatError;
use crate::core::ports::llm::{DynError, GenerationRequest};
use futures::StreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
struct GoogleRequest {
    contents: Vec<GoogleContent>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "systemInstruction")]
    system_instruction: Option<GoogleContent>,
    #[serde(rename = "generationConfig")]
    generation_config: Value,
}

#[derive(Debug, Serialize)]
struct GoogleContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Value>,
}

/// Convert turns into Gemini contents. Images ride along as `inline_data`
/// parts after the text part.
fn build_contents(turns: &[ChatTurn]) -> Vec<GoogleContent> {
    turns
        .iter()
        .map(|turn| {
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Model => "model",
            };
            let mut parts = vec![json!({ "text": turn.text })];
            if let Some(image) = &turn.image {
                parts.push(json!({
                    "inline_data": {
                        "mime_type": image.mime_type,
                        "data": image.data,
                    }
                }));
            }
            GoogleContent {
                role: Some(role.to_string()),
                parts,
            }
        })
        .collect()
}

fn build_request(request: &GenerationRequest) -> GoogleRequest {
    let system_instruction = request
        .instruction
        .as_deref()
        .filter(|text| !text.is_empty())
        .map(|text| GoogleContent {
            role: None,
            parts: vec![json!({ "text": text })],
        });

    GoogleRequest {
        contents: build_contents(&request.turns),
        system_instruction,
        generation_config: json!({
            "temperature": request.temperature,
            "maxOutputTokens": request.max_output_tokens,
        }),
    }
}

/// Drops the request URL from reqwest errors before they reach logs or replies.
fn transport_error(error: reqwest::Error) -> DynError {
    Box::new(error.without_url())
}

async fn send(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &GoogleRequest,
) -> Result<reqwest::Response, DynError> {
    let api_key = api_key.trim();
    let builder = if api_key.starts_with("AIza") {
        client.post(url).header(API_KEY_HEADER, api_key)
    } else {
        client.post(url).bearer_auth(api_key)
    };
    let response = builder.json(body).send().await.map_err(transport_error)?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(
            ChatError::ExternalService(format!("Google API error ({}): {}", status, body)).into(),
        );
    }
    Ok(response)
}

fn log_request(kind: &str, request: &GenerationRequest) {
    let images = request
        .turns
        .iter()
        .filter(|turn| turn.image.is_some())
        .count();
    log::debug!(
        "Google {} request: model={} turns={} images={} instruction={}",
        kind,
        request.model,
        request.turns.len(),
        images,
        request.instruction.is_some()
    );
}

/// Non-thought text parts of the first candidate, in order.
fn extract_text_parts(parsed: &Value) -> Vec<String> {
    parsed
        .pointer("/candidates/0/content/parts")
        .and_then(|parts| parts.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter(|part| !part.get("thought").and_then(|t| t.as_bool()).unwrap_or(false))
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .filter(|text| !text.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn extract_error(parsed: &Value) -> Option<String> {
    parsed.get("error").map(|error| {
        error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string()
    })
}

pub async fn chat_stream(
    client: &reqwest::Client,
    base_url: &str,
    request: &GenerationRequest,
    tx: mpsc::UnboundedSender<StreamEvent>,
) -> Result<(), DynError> {
    log_request("stream", request);
    let url = format!(
        "{}/models/{}:streamGenerateContent?alt=sse",
        base_url, request.model
    );
    let response = send(client, &url, &request.api_key, &build_request(request)).await?;

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut usage = None;

    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk.map_err(transport_error)?);

        // Decode whole lines only: a multi-byte character may straddle chunks.
        while let Some(line_end) = buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = buffer.drain(..=line_end).collect();
            handle_sse_line(&line, &tx, &mut usage)?;
        }
    }
    if !buffer.is_empty() {
        handle_sse_line(&buffer, &tx, &mut usage)?;
    }

    if let Some(usage) = usage {
        let _ = tx.send(StreamEvent::Usage(usage));
    }
    let _ = tx.send(StreamEvent::Done);
    Ok(())
}

fn handle_sse_line(
    line: &[u8],
    tx: &mpsc::UnboundedSender<StreamEvent>,
    usage: &mut Option<TokenUsage>,
) -> Result<(), DynError> {
    let Ok(line) = std::str::from_utf8(line) else {
        log::warn!("Google stream: skipping line that is not valid UTF-8");
        return Ok(());
    };
    let Some(data) = line.trim().strip_prefix("data: ") else {
        return Ok(());
    };
    let Ok(parsed) = serde_json::from_str::<Value>(data) else {
        return Ok(());
    };

    if let Some(message) = extract_error(&parsed) {
        return Err(ChatError::ExternalService(message).into());
    }
    // usageMetadata is cumulative; the latest chunk carries the totals.
    if let Some(latest) = extract_google_usage(&parsed) {
        *usage = Some(latest);
    }
    for text in extract_text_parts(&parsed) {
        let _ = tx.send(StreamEvent::Text(text));
    }
    Ok(())
}

pub async fn complete(
    client: &reqwest::Client,
    base_url: &str,
    request: &GenerationRequest,
) -> Result<String, DynError> {
    log_request("complete", request);
    let url = format!("{}/models/{}:generateContent", base_url, request.model);
    let response = send(client, &url, &request.api_key, &build_request(request)).await?;
    let parsed = response.json::<Value>().await.map_err(transport_error)?;

    if let Some(message) = extract_error(&parsed) {
        return Err(ChatError::ExternalService(message).into());
    }
    Ok(extract_text_parts(&parsed).concat())
}

fn parse_u64(value: Option<&Value>) -> Option<u64> {
    value.and_then(|raw| {
        raw.as_u64().or_else(|| {
            raw.as_i64()
                .and_then(|number| (number >= 0).then_some(number as u64))
        })
    })
}

fn extract_google_usage(parsed: &Value) -> Option<TokenUsage> {
    let usage = parsed.get("usageMetadata")?;
    let parsed = TokenUsage {
        input_tokens: parse_u64(usage.get("promptTokenCount")),
        output_tokens: parse_u64(usage.get("candidatesTokenCount")),
        total_tokens: parse_u64(usage.get("totalTokenCount")),
    };

    (!parsed.is_empty()).then_some(parsed)
}
