//! The external document schema and its validation (spec §4.7 step 1).
//!
//! The document *parser* (PDF/Markdown → page-node tree) is an external
//! collaborator out of scope for this runtime (spec §1); what this
//! crate accepts is the already-parsed tree shape, validated against
//! the same structural invariants the Store enforces (data model §3).

use rlm_store::{PageNodeType, StoreError};
use rlm_types::IngestError;
use serde::{Deserialize, Serialize};

/// One document submitted for ingestion, already parsed into pages and nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDocument {
    /// Caller-supplied identifier; generated if absent.
    #[serde(default)]
    pub id: Option<String>,
    /// File or logical name.
    pub name: String,
    /// Display title, if known.
    #[serde(default)]
    pub title: Option<String>,
    /// Short abstract/summary.
    #[serde(default)]
    pub r#abstract: Option<String>,
    /// File extension or format tag (e.g. "pdf", "docx").
    pub extension: String,
    /// Author, if known.
    #[serde(default)]
    pub author: Option<String>,
    /// Pages in document order.
    pub pages: Vec<InputPage>,
    /// Table-of-contents entries.
    #[serde(default)]
    pub toc_entries: Vec<InputTocEntry>,
}

/// One page of an [`InputDocument`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPage {
    /// Structural nodes in document order.
    pub nodes: Vec<InputPageNode>,
}

/// One structural node of an [`InputPage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPageNode {
    /// Caller-supplied identifier, unique within the page; generated if absent.
    #[serde(default)]
    pub local_id: Option<String>,
    /// Structural type.
    pub r#type: PageNodeType,
    /// Parent node id, for nested structure.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Heading/list level tag.
    #[serde(default)]
    pub level: Option<String>,
    /// Text content, for non-visual node types.
    #[serde(default)]
    pub content: Option<String>,
    /// Raw image bytes, for image/table node types.
    #[serde(default)]
    pub image_bytes: Option<Vec<u8>>,
    /// Description/alt text, especially for visual nodes.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether this node continues a prior one across a page break.
    #[serde(default)]
    pub continuation: bool,
    /// Caption text, for tables/images.
    #[serde(default)]
    pub caption: Option<String>,
    /// Free-form kind tag.
    #[serde(default)]
    pub kind: Option<String>,
    /// String-encoded bounding rectangle.
    #[serde(default)]
    pub bbox: Option<String>,
    /// Groups nodes that are continuations of one logical unit.
    #[serde(default)]
    pub group_id: Option<String>,
}

/// One table-of-contents entry of an [`InputDocument`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputTocEntry {
    /// Parent entry, for nested TOCs.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Display title.
    pub title: String,
    /// Optional elaboration.
    #[serde(default)]
    pub description: Option<String>,
    /// 0-based target page index.
    pub target_page: usize,
    /// Section id on the target page, if resolved.
    #[serde(default)]
    pub target_section_id: Option<String>,
    /// Nesting depth.
    #[serde(default)]
    pub level: usize,
}

/// Validate `doc` against the structural invariants the Store enforces:
/// non-blank name/title/extension, in-range TOC target pages, and
/// text/visual mutual exclusivity on every node's `content`/`image_bytes`
/// (data model §3).
pub fn validate(doc: &InputDocument) -> Result<(), IngestError> {
    if doc.name.trim().is_empty() {
        return Err(IngestError::InvalidDocument("document name must not be blank".to_string()));
    }
    if doc.extension.trim().is_empty() {
        return Err(IngestError::InvalidDocument("document extension must not be blank".to_string()));
    }
    for (page_index, page) in doc.pages.iter().enumerate() {
        for node in &page.nodes {
            let has_content = node.content.as_ref().is_some_and(|c| !c.is_empty());
            let has_image = node.image_bytes.as_ref().is_some_and(|b| !b.is_empty());
            if node.r#type.is_visual() && has_content {
                return Err(IngestError::InvalidDocument(format!(
                    "page {page_index}: visual node type {:?} must not carry text content",
                    node.r#type
                )));
            }
            if !node.r#type.is_visual() && has_image {
                return Err(IngestError::InvalidDocument(format!(
                    "page {page_index}: text node type {:?} must not carry image bytes",
                    node.r#type
                )));
            }
        }
    }
    for entry in &doc.toc_entries {
        if entry.title.trim().is_empty() {
            return Err(IngestError::InvalidDocument("toc entry title must not be blank".to_string()));
        }
        if entry.target_page >= doc.pages.len() {
            return Err(IngestError::InvalidDocument(format!(
                "toc entry targets page {} but document has {} pages",
                entry.target_page,
                doc.pages.len()
            )));
        }
    }
    Ok(())
}

/// Surface a store-side image-size rejection as an ingest error, for
/// callers that want validation to fail fast rather than silently drop
/// the blob the way [`rlm_store::Store::insert_page_node`] does.
pub fn image_too_large(max_bytes: usize) -> IngestError {
    IngestError::Store(StoreError::ImageTooLarge { max_bytes })
}
