//! Orchestrates the ingestion pipeline (spec §4.7): validate, insert
//! document → pages → nodes → TOC entries, optionally extract entities/
//! relationships, flush once after every document is processed.

use crate::extraction::{extract_page, ExtractedEntity, ExtractedRelationship};
use crate::options::IngestOptions;
use crate::result::DocumentIngestResult;
use crate::schema::{validate, InputDocument};
use chrono::{DateTime, Utc};
use rlm_store::{Document, Entity, Page, PageNode, Relationship, Store, TocEntry};
use rlm_transport::LlmTransport;
use rlm_types::IngestError;
use std::collections::HashMap;
use uuid::Uuid;

/// Ingest every document in `documents`, flushing the store exactly
/// once after all of them are processed (spec §4.7 step 4).
pub async fn ingest(
    store: &Store,
    transport: &dyn LlmTransport,
    model: &str,
    documents: Vec<InputDocument>,
    opts: &IngestOptions,
) -> Result<Vec<DocumentIngestResult>, IngestError> {
    let mut results = Vec::with_capacity(documents.len());
    for doc in documents {
        validate(&doc)?;
        results.push(ingest_one(store, transport, model, doc, opts).await?);
    }
    store.flush_now().await?;
    Ok(results)
}

async fn ingest_one(
    store: &Store,
    transport: &dyn LlmTransport,
    model: &str,
    doc: InputDocument,
    opts: &IngestOptions,
) -> Result<DocumentIngestResult, IngestError> {
    let document_id = doc.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
    let now = Utc::now();

    store
        .insert_document(Document {
            id: document_id.clone(),
            name: doc.name.clone(),
            title: doc.title.clone(),
            r#abstract: doc.r#abstract.clone(),
            extension: doc.extension.clone(),
            author: doc.author.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        })
        .await;

    let mut pages_stored = 0;
    let mut nodes_stored = 0;
    let mut pages: Vec<Vec<PageNode>> = Vec::with_capacity(doc.pages.len());

    for (page_index, input_page) in doc.pages.iter().enumerate() {
        let page_id = Page::make_id(&document_id, page_index);
        store
            .insert_page(Page {
                id: page_id.clone(),
                document_id: document_id.clone(),
                index: page_index,
            })
            .await;
        pages_stored += 1;

        let mut page_nodes = Vec::with_capacity(input_page.nodes.len());
        for (local_index, input_node) in input_page.nodes.iter().enumerate() {
            let local_id = input_node.local_id.clone().unwrap_or_else(|| local_index.to_string());
            let node = PageNode {
                id: PageNode::make_id(&page_id, &local_id),
                page_id: page_id.clone(),
                document_id: document_id.clone(),
                local_id,
                r#type: input_node.r#type,
                parent_id: input_node.parent_id.clone(),
                level: input_node.level.clone(),
                content: input_node.content.clone(),
                image_bytes: input_node.image_bytes.clone(),
                description: input_node.description.clone(),
                continuation: input_node.continuation,
                caption: input_node.caption.clone(),
                kind: input_node.kind.clone(),
                bbox: input_node.bbox.clone(),
                group_id: input_node.group_id.clone(),
            };
            store.insert_page_node(node.clone()).await;
            nodes_stored += 1;
            page_nodes.push(node);
        }
        pages.push(page_nodes);
    }

    let mut toc_entries_stored = 0;
    for entry in &doc.toc_entries {
        store
            .insert_toc_entry(TocEntry {
                id: Uuid::new_v4().to_string(),
                document_id: document_id.clone(),
                parent_id: entry.parent_id.clone(),
                title: entry.title.clone(),
                description: entry.description.clone(),
                target_page: entry.target_page,
                target_section_id: entry.target_section_id.clone(),
                level: entry.level,
                created_at: now,
            })
            .await;
        toc_entries_stored += 1;
    }

    let mut result = DocumentIngestResult {
        document_id: document_id.clone(),
        pages_stored,
        nodes_stored,
        toc_entries_stored,
        entities_extracted: None,
        relationships_extracted: None,
        pages_processed: None,
        extraction_errors: None,
        visual_nodes_scanned: None,
    };

    if opts.extract_entities {
        let summary = run_extraction(store, transport, model, &document_id, &pages, opts, now).await;
        result.entities_extracted = Some(summary.entities_inserted);
        result.relationships_extracted = Some(summary.relationships_inserted);
        result.pages_processed = Some(summary.pages_processed);
        result.visual_nodes_scanned = Some(summary.visual_nodes_scanned);
        if !summary.errors.is_empty() {
            result.extraction_errors = Some(summary.errors);
        }
    }

    Ok(result)
}

struct ExtractionSummary {
    entities_inserted: usize,
    relationships_inserted: usize,
    pages_processed: usize,
    visual_nodes_scanned: usize,
    errors: Vec<String>,
}

/// Run per-page extraction over every page, then resolve and insert
/// entities/relationships in the two phases spec §4.7 describes: phase
/// 1 inserts entities and records name→UUID; phase 2 resolves
/// relationship endpoints through that lookup, case-insensitively,
/// dropping edges that don't resolve on both ends. A page whose
/// extraction call fails is logged and skipped; it does not abort the
/// document.
async fn run_extraction(
    store: &Store,
    transport: &dyn LlmTransport,
    model: &str,
    document_id: &str,
    pages: &[Vec<PageNode>],
    opts: &IngestOptions,
    now: DateTime<Utc>,
) -> ExtractionSummary {
    let mut pending_entities: Vec<(usize, ExtractedEntity)> = Vec::new();
    let mut pending_relationships: Vec<ExtractedRelationship> = Vec::new();
    let mut errors = Vec::new();
    let mut pages_processed = 0;
    let mut visual_nodes_scanned = 0;
    let mut vision_calls_used_total = 0;
    let page_limit = opts.max_extraction_pages.unwrap_or(pages.len());

    for (page_index, nodes) in pages.iter().enumerate().take(page_limit) {
        let vision_budget_remaining = opts.max_vision_calls_per_document.saturating_sub(vision_calls_used_total);
        match extract_page(transport, model, page_index, nodes, opts.text_char_cap, vision_budget_remaining).await {
            Ok(extraction) => {
                visual_nodes_scanned += extraction.visual_nodes_scanned;
                vision_calls_used_total += extraction.vision_calls_used;
                pages_processed += 1;
                pending_entities.extend(extraction.entities.into_iter().map(|e| (page_index, e)));
                pending_relationships.extend(extraction.relationships);
            }
            Err(e) => {
                tracing::warn!(document_id, page = page_index, error = %e, "page extraction failed, skipping");
                errors.push(format!("page {page_index}: {e}"));
            }
        }
    }

    let mut name_lookup: HashMap<String, String> = HashMap::new();
    let mut entities_inserted = 0;
    for (page_index, extracted) in pending_entities {
        let id = Uuid::new_v4().to_string();
        name_lookup.insert(extracted.name.to_lowercase(), id.clone());
        store
            .insert_entity(Entity {
                id,
                name: extracted.name,
                r#type: extracted.r#type,
                description: extracted.description,
                document_id: document_id.to_string(),
                page: Some(page_index),
                section: extracted.section,
                created_at: now,
            })
            .await;
        entities_inserted += 1;
    }

    let mut relationships_inserted = 0;
    for rel in pending_relationships {
        let source_id = name_lookup.get(&rel.source.to_lowercase());
        let target_id = name_lookup.get(&rel.target.to_lowercase());
        let (Some(source_id), Some(target_id)) = (source_id, target_id) else {
            continue;
        };
        let relationship = Relationship {
            id: Uuid::new_v4().to_string(),
            source_entity_id: source_id.clone(),
            target_entity_id: target_id.clone(),
            r#type: rel.r#type,
            document_id: document_id.to_string(),
            description: rel.description,
        };
        if store.insert_relationship(relationship).await.is_ok() {
            relationships_inserted += 1;
        }
    }

    ExtractionSummary {
        entities_inserted,
        relationships_inserted,
        pages_processed,
        visual_nodes_scanned,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{InputPage, InputPageNode, InputTocEntry};
    use rlm_store::{PageNodeType, StoreConfig};
    use rlm_transport::StubTransport;
    use rlm_types::{CompletionResponse, StopReason, TokenUsage};

    fn completion(json: serde_json::Value) -> CompletionResponse {
        CompletionResponse {
            content: json.to_string(),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    fn text_node(content: &str) -> InputPageNode {
        InputPageNode {
            local_id: None,
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

    fn doc_with_one_paragraph() -> InputDocument {
        InputDocument {
            id: None,
            name: "memo.txt".to_string(),
            title: Some("Memo".to_string()),
            r#abstract: None,
            extension: "txt".to_string(),
            author: None,
            pages: vec![InputPage { nodes: vec![text_node("Acme supplies widgets.")] }],
            toc_entries: vec![InputTocEntry {
                parent_id: None,
                title: "Intro".to_string(),
                description: None,
                target_page: 0,
                target_section_id: None,
                level: 0,
            }],
        }
    }

    #[tokio::test]
    async fn ingest_without_extraction_stores_structure_and_flushes_once() {
        let store = Store::open_disposable(StoreConfig::default()).unwrap();
        let transport = StubTransport::new(vec![]);
        let results = ingest(
            &store,
            &transport,
            "test-model",
            vec![doc_with_one_paragraph()],
            &IngestOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].pages_stored, 1);
        assert_eq!(results[0].nodes_stored, 1);
        assert_eq!(results[0].toc_entries_stored, 1);
        assert!(results[0].entities_extracted.is_none());
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn extraction_resolves_relationships_through_the_name_lookup() {
        let store = Store::open_disposable(StoreConfig::default()).unwrap();
        let transport = StubTransport::new(vec![completion(serde_json::json!({
            "entities": [
                {"name": "Acme", "type": "party", "description": "the vendor"},
                {"name": "Globex", "type": "party", "description": "the buyer"},
            ],
            "relationships": [
                {"source": "acme", "target": "globex", "type": "supplies", "description": "widgets"},
            ]
        }))]);
        let mut opts = IngestOptions::default();
        opts.extract_entities = true;
        let results = ingest(&store, &transport, "test-model", vec![doc_with_one_paragraph()], &opts)
            .await
            .unwrap();
        assert_eq!(results[0].entities_extracted, Some(2));
        assert_eq!(results[0].relationships_extracted, Some(1));
        assert_eq!(results[0].pages_processed, Some(1));
        assert!(results[0].extraction_errors.is_none());
    }

    #[tokio::test]
    async fn an_unresolved_relationship_endpoint_is_dropped_not_inserted() {
        let store = Store::open_disposable(StoreConfig::default()).unwrap();
        let transport = StubTransport::new(vec![completion(serde_json::json!({
            "entities": [{"name": "Acme", "type": "party", "description": "the vendor"}],
            "relationships": [
                {"source": "Acme", "target": "Nobody", "type": "supplies"},
            ]
        }))]);
        let mut opts = IngestOptions::default();
        opts.extract_entities = true;
        let results = ingest(&store, &transport, "test-model", vec![doc_with_one_paragraph()], &opts)
            .await
            .unwrap();
        assert_eq!(results[0].entities_extracted, Some(1));
        assert_eq!(results[0].relationships_extracted, Some(0));
    }

    #[tokio::test]
    async fn a_malformed_document_is_rejected_before_any_insert() {
        let store = Store::open_disposable(StoreConfig::default()).unwrap();
        let transport = StubTransport::new(vec![]);
        let mut doc = doc_with_one_paragraph();
        doc.name = "".to_string();
        let err = ingest(&store, &transport, "test-model", vec![doc], &IngestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidDocument(_)));
        assert!(!store.is_dirty());
    }
}
