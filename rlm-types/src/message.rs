//! Chat message and completion request/response types.

use serde::{Deserialize, Serialize};

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human user, or the Engine speaking on the user's behalf (feedback messages).
    User,
    /// The LLM.
    Assistant,
    /// The system prompt.
    System,
}

/// A content block within a message.
///
/// Multimodal content uses an ordered list of blocks with image data
/// encoded as data URIs, per spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text content.
    Text {
        /// The text.
        text: String,
    },
    /// An image, referenced as a `data:<media-type>;base64,<payload>` URI.
    ImageUrl {
        /// The data URI.
        url: String,
    },
}

impl ContentBlock {
    /// Construct a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Construct an image block from raw bytes, base64-encoding them into a data URI.
    pub fn image(media_type: &str, bytes: &[u8]) -> Self {
        use std::fmt::Write as _;
        let mut url = format!("data:{media_type};base64,");
        let _ = write!(url, "{}", base64_encode(bytes));
        Self::ImageUrl { url }
    }
}

/// Minimal base64 encoder so this crate doesn't need an extra dependency
/// solely for building data URIs.
fn base64_encode(bytes: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0];
        let b1 = chunk.get(1).copied();
        let b2 = chunk.get(2).copied();
        out.push(ALPHABET[(b0 >> 2) as usize] as char);
        out.push(ALPHABET[(((b0 & 0x03) << 4) | (b1.unwrap_or(0) >> 4)) as usize] as char);
        if let Some(b1) = b1 {
            out.push(ALPHABET[(((b1 & 0x0f) << 2) | (b2.unwrap_or(0) >> 6)) as usize] as char);
        } else {
            out.push('=');
        }
        if let Some(b2) = b2 {
            out.push(ALPHABET[(b2 & 0x3f) as usize] as char);
        } else {
            out.push('=');
        }
    }
    out
}

/// A message in a conversation, as stored by the engine and sent to the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message author role.
    pub role: Role,
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// A user message with a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// An assistant message with a single text block.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// A system message with a single text block.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Concatenate all text blocks in this message.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::ImageUrl { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// A tool definition forwarded to the transport, if the provider supports
/// native tool-calling (unused by the sandbox tool bindings themselves,
/// which are invoked from inside rhai code rather than via provider tool
/// calls — kept for parity with spec §6's message-format contract).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub input_schema: serde_json::Value,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Model reached a natural end of turn.
    EndTurn,
    /// Hit the max token limit.
    MaxTokens,
    /// Hit a stop sequence.
    StopSequence,
}

/// Token usage reported by the transport for one completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub input_tokens: usize,
    /// Tokens in the completion.
    pub output_tokens: usize,
}

impl TokenUsage {
    /// Total tokens (input + output).
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

/// A request to the LLM transport (spec §6's external-collaborator contract).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation so far, system prompt first.
    pub messages: Vec<Message>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Per-call timeout, milliseconds.
    pub timeout_ms: Option<u64>,
}

/// A response from the LLM transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Raw assistant content string (the engine parses this through the
    /// structured-output spec, falling back to fenced code block
    /// extraction on parse failure).
    pub content: String,
    /// Why generation stopped.
    pub stop_reason: StopReason,
    /// Token usage for this call.
    pub usage: TokenUsage,
}

/// A minimal stand-in for the "structured-output schema DSL" that spec §6
/// marks as an external collaborator. Produces a prompt fragment
/// describing the required JSON shape and validates/parses a response
/// string against a JSON Schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredSpec {
    /// Human-readable name, spliced into the prompt fragment.
    pub name: String,
    /// JSON Schema describing the required response shape.
    pub schema: serde_json::Value,
}

impl StructuredSpec {
    /// Create a new structured-output spec.
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Render the prompt fragment describing the required shape.
    pub fn render(&self) -> String {
        format!(
            "Respond with a single JSON object named `{}` matching this schema:\n{}",
            self.name,
            serde_json::to_string_pretty(&self.schema).unwrap_or_default()
        )
    }

    /// Parse and (shallowly) validate a response string against this spec.
    ///
    /// Only checks that required top-level keys from the schema are
    /// present; full JSON Schema validation is out of scope (spec §1).
    pub fn parse(&self, response: &str) -> Result<serde_json::Value, String> {
        let value: serde_json::Value = extract_json(response)
            .ok_or_else(|| "no JSON object found in response".to_string())?;
        if let Some(required) = self.schema.get("required").and_then(|r| r.as_array()) {
            for key in required {
                let Some(key) = key.as_str() else { continue };
                if value.get(key).is_none() {
                    return Err(format!("missing required field `{key}`"));
                }
            }
        }
        Ok(value)
    }
}

/// Extract the first balanced top-level JSON object or array from `text`,
/// tolerating surrounding prose and fenced code blocks.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut start = None;
    let mut in_string = false;
    let mut escape = false;
    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        if let Ok(v) = serde_json::from_str(&text[s..=i]) {
                            return Some(v);
                        }
                    }
                    start = None;
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_text_concatenates_blocks() {
        let msg = Message {
            role: Role::Assistant,
            content: vec![ContentBlock::text("a"), ContentBlock::text("b")],
        };
        assert_eq!(msg.text(), "ab");
    }

    #[test]
    fn extract_json_skips_prose() {
        let text = "here is the answer:\n```json\n{\"thinking\": \"ok\", \"code\": []}\n```\ndone";
        let v = extract_json(text).unwrap();
        assert_eq!(v["thinking"], "ok");
    }

    #[test]
    fn extract_json_handles_braces_in_strings() {
        let text = r#"{"code": ["(FINAL \"a { b\")"]}"#;
        let v = extract_json(text).unwrap();
        assert_eq!(v["code"][0], "(FINAL \"a { b\")");
    }

    #[test]
    fn extract_json_none_when_absent() {
        assert!(extract_json("no json here").is_none());
    }

    #[test]
    fn structured_spec_validates_required_fields() {
        let spec = StructuredSpec::new(
            "turn",
            serde_json::json!({"required": ["thinking", "code"]}),
        );
        assert!(spec.parse(r#"{"thinking": "x", "code": []}"#).is_ok());
        assert!(spec.parse(r#"{"thinking": "x"}"#).is_err());
    }

    #[test]
    fn image_block_produces_data_uri() {
        let block = ContentBlock::image("image/png", b"hi");
        match block {
            ContentBlock::ImageUrl { url } => assert!(url.starts_with("data:image/png;base64,")),
            ContentBlock::Text { .. } => panic!("expected image"),
        }
    }
}
