//! Record shapes that make up the knowledge graph (data model §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A document owns pages and TOC entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier.
    pub id: String,
    /// File or logical name.
    pub name: String,
    /// Display title, if known.
    pub title: Option<String>,
    /// Short abstract/summary.
    pub r#abstract: Option<String>,
    /// File extension or format tag (e.g. "pdf", "docx").
    pub extension: String,
    /// Author, if known.
    pub author: Option<String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A page within a document. Owns page nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// `{document-id}-page-{index}`.
    pub id: String,
    /// Owning document.
    pub document_id: String,
    /// 0-based page index.
    pub index: usize,
}

impl Page {
    /// Derive the conventional page id for a document and index.
    pub fn make_id(document_id: &str, index: usize) -> String {
        format!("{document_id}-page-{index}")
    }
}

/// Structural kind of a [`PageNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageNodeType {
    /// A structural section grouping.
    Section,
    /// A heading (see `level` for h1-h6).
    Heading,
    /// A paragraph of body text.
    Paragraph,
    /// One item of a list.
    ListItem,
    /// An image; carries `image_bytes`, never `content`.
    Image,
    /// A table; carries `image_bytes`, never `content`.
    Table,
    /// A running header.
    Header,
    /// A running footer.
    Footer,
    /// Document metadata embedded in the page stream.
    Metadata,
}

impl PageNodeType {
    /// Whether this node type is rendered visually (image bytes) rather
    /// than textually (content).
    pub fn is_visual(&self) -> bool {
        matches!(self, Self::Image | Self::Table)
    }
}

/// A single structural unit of a page: a heading, paragraph, image, etc.
///
/// Text and visual nodes are mutually exclusive on `content`/`image_bytes`
/// (data model §3); [`PageNode::new`] enforces this at construction and
/// the store enforces the 5 MiB image cap on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageNode {
    /// `{page-id}-node-{local-id}`.
    pub id: String,
    /// Owning page.
    pub page_id: String,
    /// Owning document (denormalized for filterable search).
    pub document_id: String,
    /// Node-local identifier, unique within the page.
    pub local_id: String,
    /// Structural type.
    pub r#type: PageNodeType,
    /// Parent node id, for nested structure.
    pub parent_id: Option<String>,
    /// Heading/list level tag (e.g. "h1"-"h6", "l1"-"l6", "paragraph").
    pub level: Option<String>,
    /// Text content, for non-visual node types.
    pub content: Option<String>,
    /// Raw image bytes, for image/table node types. Capped at 5 MiB by
    /// the store (larger blobs are refused, not the record).
    pub image_bytes: Option<Vec<u8>>,
    /// Description/alt text, especially for visual nodes.
    pub description: Option<String>,
    /// Whether this node continues a prior one across a page break.
    pub continuation: bool,
    /// Caption text, for tables/images.
    pub caption: Option<String>,
    /// Free-form kind tag (e.g. table subtype).
    pub kind: Option<String>,
    /// String-encoded bounding rectangle, e.g. "x0,y0,x1,y1".
    pub bbox: Option<String>,
    /// Groups nodes that are continuations of one logical unit.
    pub group_id: Option<String>,
}

impl PageNode {
    /// Derive the conventional node id for a page and local id.
    pub fn make_id(page_id: &str, local_id: &str) -> String {
        format!("{page_id}-node-{local_id}")
    }

    /// The textual fields searched by case-insensitive substring match.
    pub fn searchable_text(&self) -> String {
        let mut s = String::new();
        if let Some(c) = &self.content {
            s.push_str(c);
        }
        if let Some(d) = &self.description {
            s.push(' ');
            s.push_str(d);
        }
        s
    }
}

/// A table-of-contents entry belonging to a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocEntry {
    /// Unique identifier.
    pub id: String,
    /// Owning document.
    pub document_id: String,
    /// Parent entry, for nested TOCs.
    pub parent_id: Option<String>,
    /// Display title.
    pub title: String,
    /// Optional elaboration.
    pub description: Option<String>,
    /// 0-based target page index.
    pub target_page: usize,
    /// Section id on the target page, if resolved.
    pub target_section_id: Option<String>,
    /// Nesting depth.
    pub level: usize,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl TocEntry {
    /// The textual fields searched by case-insensitive substring match.
    pub fn searchable_text(&self) -> String {
        match &self.description {
            Some(d) => format!("{} {}", self.title, d),
            None => self.title.clone(),
        }
    }
}

/// A named entity extracted from, or manually attached to, a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier (UUID).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Kind tag (e.g. "party", "obligation", "condition", "term", "clause", "cross-reference").
    pub r#type: String,
    /// Free-text description.
    pub description: String,
    /// Owning document.
    pub document_id: String,
    /// Page index where this entity was found.
    pub page: Option<usize>,
    /// Section id where this entity was found.
    pub section: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Entity {
    /// The textual fields searched by case-insensitive substring match.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.name, self.description)
    }
}

/// A directed relationship between two entities.
///
/// `source_entity_id`/`target_entity_id` must resolve to existing
/// entities at write time (data model §3); the store enforces this on
/// insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier.
    pub id: String,
    /// Source entity id.
    pub source_entity_id: String,
    /// Target entity id.
    pub target_entity_id: String,
    /// Kind tag (e.g. "references", "defines", "obligates", "conditions", "amends").
    pub r#type: String,
    /// Owning document.
    pub document_id: String,
    /// Free-text description.
    pub description: Option<String>,
}

/// A verdict on a verified claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationVerdict {
    /// The claim is fully supported by the cited evidence.
    Correct,
    /// The claim contradicts the cited evidence.
    Incorrect,
    /// The claim is supported in part.
    PartiallyCorrect,
    /// Evidence is insufficient to decide.
    Uncertain,
}

/// A single factual assertion produced during refinement, with its
/// supporting citation and verification status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier.
    pub id: String,
    /// Claim text.
    pub text: String,
    /// Supporting document, if cited.
    pub document_id: Option<String>,
    /// Supporting page, if cited.
    pub page: Option<usize>,
    /// Supporting section, if cited.
    pub section: Option<String>,
    /// Verbatim supporting quote, if cited.
    pub quote: Option<String>,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// The refinement query this claim was produced for.
    pub query_id: Option<String>,
    /// Whether this claim has been run through verification.
    pub verified: bool,
    /// The verification verdict, once verified.
    pub verification_verdict: Option<VerificationVerdict>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A role in a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The end user, or the engine on the user's behalf (feedback).
    User,
    /// The LLM.
    Assistant,
    /// The system prompt.
    System,
}

/// One turn in the conversation log, ordered by timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier.
    pub id: String,
    /// Author role.
    pub role: MessageRole,
    /// Message content; must be non-blank.
    pub content: String,
    /// Token count for this message.
    pub tokens: usize,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// 0-based iteration this message belongs to.
    pub iteration: usize,
}

/// A reusable insight accumulated across queries, subject to decay.
///
/// A learning is *decayed* when total votes >= 5 and the negative
/// fraction exceeds 0.7; decayed learnings are excluded from search by
/// default (data model §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learning {
    /// Unique identifier.
    pub id: String,
    /// The insight text.
    pub insight: String,
    /// Free-text context this insight was drawn from.
    pub context: Option<String>,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Count of "useful" votes.
    pub useful_count: u32,
    /// Count of "not useful" votes.
    pub not_useful_count: u32,
    /// Count of times this learning was surfaced and applied.
    pub applied_count: u32,
    /// Last time a vote was recorded.
    pub last_evaluated: Option<DateTime<Utc>>,
}

impl Learning {
    /// Whether this learning should be excluded from search by default.
    pub fn decayed(&self) -> bool {
        let total = self.useful_count + self.not_useful_count;
        if total < 5 {
            return false;
        }
        (self.not_useful_count as f64 / total as f64) > 0.7
    }

    /// The textual fields searched by case-insensitive substring match.
    pub fn searchable_text(&self) -> String {
        match &self.context {
            Some(c) => format!("{} {}", self.insight, c),
            None => self.insight.clone(),
        }
    }
}

/// A scored record of one completed query, used as a few-shot example
/// in future prompt building.
///
/// Stored process-wide in a size-bounded (100-entry) LRU-by-timestamp
/// collection (data model §3, §9) rather than per-store: examples are
/// useful across environments, not just within one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example {
    /// The original query.
    pub query: String,
    /// A short summary of the context available when answering.
    pub context_summary: String,
    /// The final answer produced.
    pub answer: String,
    /// Evaluation score, 0-40.
    pub score: u8,
    /// Evaluator feedback, if any.
    pub feedback: Option<String>,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
}

impl Example {
    /// Whether this example is "good" (score >= 32) and fit to show the
    /// model as a positive pattern.
    pub fn good(&self) -> bool {
        self.score >= 32
    }
}
