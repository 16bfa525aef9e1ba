//! Aggregate counters reported by `Store::stats`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Type-count frequencies and vote/application totals for a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of documents.
    pub document_count: usize,
    /// Number of pages.
    pub page_count: usize,
    /// Page node counts keyed by their kebab-case type tag.
    pub page_node_counts_by_type: HashMap<String, usize>,
    /// Number of TOC entries.
    pub toc_entry_count: usize,
    /// Entity counts keyed by their type tag.
    pub entity_counts_by_type: HashMap<String, usize>,
    /// Number of relationships.
    pub relationship_count: usize,
    /// Number of claims.
    pub claim_count: usize,
    /// Number of messages.
    pub message_count: usize,
    /// Number of learnings.
    pub learning_count: usize,
    /// Number of decayed learnings.
    pub decayed_learning_count: usize,
    /// Sum of `useful_count` across all learnings.
    pub total_useful_votes: u64,
    /// Sum of `not_useful_count` across all learnings.
    pub total_not_useful_votes: u64,
    /// Sum of `applied_count` across all learnings.
    pub total_applied_count: u64,
}
