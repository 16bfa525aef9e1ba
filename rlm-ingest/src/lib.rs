#![deny(missing_docs)]
//! Ingestion pipeline for the RLM agent runtime (component design §4.7).
//!
//! [`pipeline::ingest`] validates each submitted document, inserts its
//! pages/nodes/TOC entries into the store, optionally extracts entities
//! and relationships from it, and flushes the store exactly once after
//! every document has been processed.
//!
//! Grounded in the store's insert operations plus the two-phase
//! name-to-UUID entity/relationship resolution described in the data
//! model; the extraction call itself is grounded in the per-turn
//! structured-call shape shared with `rlm-engine` and `rlm-refine`.

mod extraction;
mod options;
mod pipeline;
mod result;
mod schema;

pub use extraction::{
    extract_page, ExtractedEntity, ExtractedRelationship, PageExtraction,
    DEFAULT_MAX_VISION_CALLS_PER_DOCUMENT, DEFAULT_TEXT_CHAR_CAP,
};
pub use options::IngestOptions;
pub use pipeline::ingest;
pub use result::DocumentIngestResult;
pub use schema::{image_too_large, validate, InputDocument, InputPage, InputPageNode, InputTocEntry};
