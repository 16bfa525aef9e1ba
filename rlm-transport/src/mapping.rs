//! Wire mapping between [`CompletionRequest`]/[`CompletionResponse`] and
//! the OpenAI chat-completions JSON shape (spec §6: "Messages follow the
//! OpenAI chat format").

use rlm_types::{CompletionRequest, CompletionResponse, ContentBlock, Role, StopReason, TokenUsage, TransportError};
use serde_json::{json, Value};

/// Build the request body for the chat-completions endpoint.
pub fn to_api_request(request: &CompletionRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|m| {
            json!({
                "role": role_str(m.role),
                "content": m.content.iter().map(content_block_json).collect::<Vec<_>>(),
            })
        })
        .collect();

    let mut body = json!({
        "model": request.model,
        "messages": messages,
    });
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    body
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

fn content_block_json(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Text { text } => json!({"type": "text", "text": text}),
        ContentBlock::ImageUrl { url } => json!({"type": "image_url", "image_url": {"url": url}}),
    }
}

/// Parse a chat-completions JSON response into [`CompletionResponse`].
pub fn from_api_response(value: &Value) -> Result<CompletionResponse, TransportError> {
    let choice = value
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| TransportError::Other("response has no choices".into()))?;

    let content = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| TransportError::Other("response choice has no message content".into()))?
        .to_string();

    let stop_reason = match choice.get("finish_reason").and_then(Value::as_str) {
        Some("length") => StopReason::MaxTokens,
        Some("stop_sequence") => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    };

    let usage = value
        .get("usage")
        .map(|u| TokenUsage {
            input_tokens: u.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0) as usize,
            output_tokens: u
                .get("completion_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0) as usize,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        content,
        stop_reason,
        usage,
    })
}
