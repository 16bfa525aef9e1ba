//! Per-call ingestion options (spec §4.7: `ingest(env, documents, opts)`).

use crate::extraction::{DEFAULT_MAX_VISION_CALLS_PER_DOCUMENT, DEFAULT_TEXT_CHAR_CAP};

/// Tunables for one [`crate::pipeline::ingest`] call.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Whether to run entity/relationship extraction after storing
    /// pages/nodes/TOC entries.
    pub extract_entities: bool,
    /// Character cap on concatenated text-node content sent to one
    /// page's extraction call.
    pub text_char_cap: usize,
    /// Cap on vision calls (one per visual node sent as an image block)
    /// across one document.
    pub max_vision_calls_per_document: usize,
    /// Cap on how many of a document's pages are run through
    /// extraction, in page order; `None` means every page.
    pub max_extraction_pages: Option<usize>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            extract_entities: false,
            text_char_cap: DEFAULT_TEXT_CHAR_CAP,
            max_vision_calls_per_document: DEFAULT_MAX_VISION_CALLS_PER_DOCUMENT,
            max_extraction_pages: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_numbers() {
        let opts = IngestOptions::default();
        assert!(!opts.extract_entities);
        assert_eq!(opts.text_char_cap, 8000);
        assert_eq!(opts.max_vision_calls_per_document, 10);
        assert!(opts.max_extraction_pages.is_none());
    }
}
