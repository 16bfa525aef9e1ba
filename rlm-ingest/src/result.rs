//! Per-document ingestion result (spec §4.7).

use serde::{Deserialize, Serialize};

/// The outcome of ingesting one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentIngestResult {
    /// The document's resolved identifier (generated if none was supplied).
    pub document_id: String,
    /// Pages stored.
    pub pages_stored: usize,
    /// Page nodes stored.
    pub nodes_stored: usize,
    /// TOC entries stored.
    pub toc_entries_stored: usize,
    /// Entities inserted, if extraction ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities_extracted: Option<usize>,
    /// Relationships inserted (both endpoints resolved), if extraction ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships_extracted: Option<usize>,
    /// Pages successfully run through extraction, if it ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_processed: Option<usize>,
    /// Per-page extraction failures, if extraction ran and any occurred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_errors: Option<Vec<String>>,
    /// Visual nodes seen across the document, if extraction ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_nodes_scanned: Option<usize>,
}
