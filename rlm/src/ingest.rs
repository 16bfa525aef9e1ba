//! `ingest!` options (spec §6: `{extract-entities?, extraction-model?,
//! max-extraction-pages?, max-vision-rescan-nodes?}`), mapped onto
//! [`rlm_ingest::IngestOptions`] plus the per-call extraction model
//! override the lower-level crate leaves to its caller.

use rlm_ingest::IngestOptions;

/// Tunables for one [`crate::Environment::ingest`] call.
#[derive(Debug, Clone, Default)]
pub struct RlmIngestOptions {
    /// Whether to run entity/relationship extraction after storing
    /// pages/nodes/TOC entries.
    pub extract_entities: bool,
    /// Model used for extraction calls; falls back to the environment's
    /// default model if unset.
    pub extraction_model: Option<String>,
    /// Cap on how many of a document's pages are run through extraction.
    pub max_extraction_pages: Option<usize>,
    /// Cap on vision calls (one per visual node sent as an image block)
    /// across one document.
    pub max_vision_rescan_nodes: Option<usize>,
}

impl RlmIngestOptions {
    pub(crate) fn into_ingest_options(self) -> IngestOptions {
        let mut opts = IngestOptions {
            extract_entities: self.extract_entities,
            max_extraction_pages: self.max_extraction_pages,
            ..IngestOptions::default()
        };
        if let Some(max_vision) = self.max_vision_rescan_nodes {
            opts.max_vision_calls_per_document = max_vision;
        }
        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_fall_back_to_ingest_defaults() {
        let opts = RlmIngestOptions::default().into_ingest_options();
        assert!(!opts.extract_entities);
        assert_eq!(opts.max_vision_calls_per_document, rlm_ingest::DEFAULT_MAX_VISION_CALLS_PER_DOCUMENT);
    }

    #[test]
    fn max_vision_rescan_nodes_overrides_the_default() {
        let opts = RlmIngestOptions {
            max_vision_rescan_nodes: Some(3),
            ..Default::default()
        }
        .into_ingest_options();
        assert_eq!(opts.max_vision_calls_per_document, 3);
    }
}
