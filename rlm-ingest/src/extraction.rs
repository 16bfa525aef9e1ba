//! Entity/relationship extraction, per page (spec §4.7 step 3).
//!
//! Text nodes are concatenated and truncated to a character cap; visual
//! nodes get a vision call with their image bytes as a multimodal
//! content block, up to a per-document budget, falling back to their
//! `description` text when the budget is spent or bytes are absent.

use rlm_store::PageNode;
use rlm_transport::LlmTransport;
use rlm_types::{CompletionRequest, ContentBlock, IngestError, Message, Role, StructuredSpec};
use serde::{Deserialize, Serialize};

/// Default character cap on concatenated text-node content sent to the
/// extraction call for one page.
pub const DEFAULT_TEXT_CHAR_CAP: usize = 8000;

/// Default cap on vision calls (one per visual node) across one document.
pub const DEFAULT_MAX_VISION_CALLS_PER_DOCUMENT: usize = 10;

/// One entity surfaced by the extraction call, referencing its source
/// by name rather than UUID (resolved to a UUID on insertion).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    /// Display name; used as the resolution key for relationships.
    pub name: String,
    /// Kind tag (e.g. "party", "obligation", "condition").
    pub r#type: String,
    /// Free-text description.
    pub description: String,
    /// Section id within the page, if identifiable.
    #[serde(default)]
    pub section: Option<String>,
}

/// One relationship surfaced by the extraction call, with its endpoints
/// still as the names the model used rather than resolved UUIDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRelationship {
    /// Source entity name, matched case-insensitively against extracted entities.
    pub source: String,
    /// Target entity name, matched case-insensitively against extracted entities.
    pub target: String,
    /// Kind tag (e.g. "references", "defines", "obligates").
    pub r#type: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
struct RawExtraction {
    entities: Vec<ExtractedEntity>,
    #[serde(default)]
    relationships: Vec<ExtractedRelationship>,
}

fn spec() -> StructuredSpec {
    StructuredSpec::new("extraction", serde_json::json!({"required": ["entities", "relationships"]}))
}

/// Outcome of extracting over one page.
pub struct PageExtraction {
    /// Entities found on this page.
    pub entities: Vec<ExtractedEntity>,
    /// Relationships found on this page (endpoints unresolved).
    pub relationships: Vec<ExtractedRelationship>,
    /// Visual nodes encountered on this page, whether or not a vision
    /// call was actually made for them.
    pub visual_nodes_scanned: usize,
    /// Vision calls actually spent on this page.
    pub vision_calls_used: usize,
}

fn truncated(text: &str, cap: usize) -> String {
    let mut end = text.len().min(cap);
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Extract entities/relationships from one page's nodes, sending at
/// most `vision_budget_remaining` of its visual nodes as image content
/// blocks and falling back to description-only text for the rest (or
/// for any node with no image bytes at all).
pub async fn extract_page(
    transport: &dyn LlmTransport,
    model: &str,
    page_index: usize,
    nodes: &[PageNode],
    text_char_cap: usize,
    vision_budget_remaining: usize,
) -> Result<PageExtraction, IngestError> {
    let mut text = String::new();
    let mut image_blocks = Vec::new();
    let mut visual_nodes_scanned = 0;
    let mut vision_calls_used = 0;

    for node in nodes {
        if node.r#type.is_visual() {
            visual_nodes_scanned += 1;
            match &node.image_bytes {
                Some(bytes) if vision_calls_used < vision_budget_remaining => {
                    image_blocks.push(ContentBlock::image("image/png", bytes));
                    vision_calls_used += 1;
                }
                _ => {
                    if let Some(description) = &node.description {
                        text.push_str(description);
                        text.push('\n');
                    }
                }
            }
        } else if let Some(content) = &node.content {
            text.push_str(content);
            text.push('\n');
        }
    }

    let instructions = format!(
        "Extract named entities and the relationships between them from \
         page {page_index} of a document. For each entity report a name, \
         a type tag, and a description. For each relationship report the \
         source and target entity names exactly as reported in entities, \
         a type tag, and an optional description.\n\nText:\n{}",
        truncated(&text, text_char_cap)
    );

    let mut content = vec![ContentBlock::text(instructions + "\n\n" + &spec().render())];
    content.extend(image_blocks);

    let request = CompletionRequest {
        model: model.to_string(),
        messages: vec![Message { role: Role::User, content }],
        temperature: None,
        timeout_ms: None,
    };
    let response = transport.complete(request).await?;
    let value = spec().parse(&response.content).map_err(|e| {
        IngestError::ExtractionFailed(rlm_types::TransportError::Other(e))
    })?;
    let raw: RawExtraction = serde_json::from_value(value).map_err(|e| {
        IngestError::ExtractionFailed(rlm_types::TransportError::Other(e.to_string()))
    })?;

    Ok(PageExtraction {
        entities: raw.entities,
        relationships: raw.relationships,
        visual_nodes_scanned,
        vision_calls_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlm_store::PageNodeType;
    use rlm_transport::StubTransport;
    use rlm_types::{CompletionResponse, StopReason, TokenUsage};

    fn completion(json: serde_json::Value) -> CompletionResponse {
        CompletionResponse {
            content: json.to_string(),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    fn text_node(content: &str) -> PageNode {
        PageNode {
            id: "p0-node-0".to_string(),
            page_id: "p0".to_string(),
            document_id: "doc".to_string(),
            local_id: "0".to_string(),
            r#type: PageNodeType::Paragraph,
            parent_id: None,
            level: None,
            content: Some(content.to_string()),
            image_bytes: None,
            description: None,
            continuation: false,
            caption: None,
            kind: None,
            bbox: None,
            group_id: None,
        }
    }

    fn image_node(bytes: Option<Vec<u8>>, description: Option<&str>) -> PageNode {
        PageNode {
            id: "p0-node-1".to_string(),
            page_id: "p0".to_string(),
            document_id: "doc".to_string(),
            local_id: "1".to_string(),
            r#type: PageNodeType::Image,
            parent_id: None,
            level: None,
            content: None,
            image_bytes: bytes,
            description: description.map(|d| d.to_string()),
            continuation: false,
            caption: None,
            kind: None,
            bbox: None,
            group_id: None,
        }
    }

    #[tokio::test]
    async fn extracts_entities_and_relationships_from_text_nodes() {
        let transport = StubTransport::new(vec![completion(serde_json::json!({
            "entities": [{"name": "Acme", "type": "party", "description": "the vendor"}],
            "relationships": []
        }))]);
        let nodes = vec![text_node("Acme supplies widgets.")];
        let result = extract_page(&transport, "test-model", 0, &nodes, DEFAULT_TEXT_CHAR_CAP, DEFAULT_MAX_VISION_CALLS_PER_DOCUMENT)
            .await
            .unwrap();
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.visual_nodes_scanned, 0);
    }

    #[tokio::test]
    async fn an_image_node_without_bytes_falls_back_to_description_only() {
        let transport = StubTransport::new(vec![completion(serde_json::json!({
            "entities": [],
            "relationships": []
        }))]);
        let nodes = vec![image_node(None, Some("a diagram of the org chart"))];
        let result = extract_page(&transport, "test-model", 0, &nodes, DEFAULT_TEXT_CHAR_CAP, DEFAULT_MAX_VISION_CALLS_PER_DOCUMENT)
            .await
            .unwrap();
        assert_eq!(result.visual_nodes_scanned, 1);
        assert_eq!(result.vision_calls_used, 0);
    }

    #[tokio::test]
    async fn vision_budget_of_zero_forces_description_fallback() {
        let transport = StubTransport::new(vec![completion(serde_json::json!({
            "entities": [],
            "relationships": []
        }))]);
        let nodes = vec![image_node(Some(vec![1, 2, 3]), Some("a photo"))];
        let result = extract_page(&transport, "test-model", 0, &nodes, DEFAULT_TEXT_CHAR_CAP, 0)
            .await
            .unwrap();
        assert_eq!(result.visual_nodes_scanned, 1);
        assert_eq!(result.vision_calls_used, 0);
    }

    #[tokio::test]
    async fn an_image_node_with_bytes_under_budget_spends_a_vision_call() {
        let transport = StubTransport::new(vec![completion(serde_json::json!({
            "entities": [],
            "relationships": []
        }))]);
        let nodes = vec![image_node(Some(vec![1, 2, 3]), Some("a photo"))];
        let result = extract_page(&transport, "test-model", 0, &nodes, DEFAULT_TEXT_CHAR_CAP, DEFAULT_MAX_VISION_CALLS_PER_DOCUMENT)
            .await
            .unwrap();
        assert_eq!(result.vision_calls_used, 1);
    }
}
