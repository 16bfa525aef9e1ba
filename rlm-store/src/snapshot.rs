//! On-disk snapshot format.
//!
//! The snapshot is a single pretty-printed JSON file — human-readable for
//! debuggability, per the store's persistence contract. The exact bytes
//! are not a contract; only round-tripping through [`Snapshot`] is.

use crate::records::{Document, Entity, Learning, Message, Page, PageNode, Relationship, TocEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot file name within a store's directory.
pub const SNAPSHOT_FILE_NAME: &str = "rlm-store-snapshot.json";

/// The full on-disk representation of one store's collections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Documents by id.
    pub documents: HashMap<String, Document>,
    /// Pages by id.
    pub pages: HashMap<String, Page>,
    /// Page nodes by id.
    pub page_nodes: HashMap<String, PageNode>,
    /// TOC entries by id.
    pub toc_entries: HashMap<String, TocEntry>,
    /// Entities by id.
    pub entities: HashMap<String, Entity>,
    /// Relationships by id.
    pub relationships: HashMap<String, Relationship>,
    /// Claims by id.
    pub claims: HashMap<String, crate::records::Claim>,
    /// Messages by id.
    pub messages: HashMap<String, Message>,
    /// Learnings by id.
    pub learnings: HashMap<String, Learning>,
}
