#![deny(missing_docs)]
//! The durable knowledge store for the RLM agent runtime.
//!
//! A process-local typed multi-collection store (data model §3,
//! component design §4.1), opened either disposable (fresh temp
//! directory, deleted on dispose) or persistent (caller-supplied
//! directory, snapshot loaded on open and retained on dispose).

mod examples;
mod filters;
mod records;
mod snapshot;
mod stats;
mod store;

pub use examples::{ExampleBank, MAX_EXAMPLES};
pub use filters::{
    DocumentFilter, EntityFilter, LearningFilter, PageNodeFilter, TocEntryFilter,
    DEFAULT_SEARCH_LIMIT,
};
pub use records::{
    Claim, Document, Entity, Example, Learning, Message, MessageRole, Page, PageNode,
    PageNodeType, Relationship, TocEntry, VerificationVerdict,
};
pub use snapshot::{Snapshot, SNAPSHOT_FILE_NAME};
pub use stats::StoreStats;
pub use store::{LearningVote, Store, StoreConfig, DEFAULT_MAX_IMAGE_BYTES};
