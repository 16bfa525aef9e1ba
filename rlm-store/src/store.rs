//! The durable knowledge store (component design §4.1).

use crate::filters::{
    DocumentFilter, EntityFilter, LearningFilter, PageNodeFilter, TocEntryFilter,
    DEFAULT_SEARCH_LIMIT,
};
use crate::records::{
    Claim, Document, Entity, Learning, Message, Page, PageNode, Relationship, TocEntry,
};
use crate::snapshot::{Snapshot, SNAPSHOT_FILE_NAME};
use crate::stats::StoreStats;
use rlm_types::StoreError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Image blobs above this size are refused outright (data model §3).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Whether a vote is in favor of, or against, a learning's usefulness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningVote {
    /// The learning was useful.
    Useful,
    /// The learning was not useful.
    NotUseful,
}

/// Store configuration, resolved at construction.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Hard cap on image/table node blob size. Defaults to 5 MiB
    /// (the Open Question on this cap is resolved in favor of a
    /// configurable field rather than a hardcoded literal).
    pub max_image_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

enum Backing {
    /// Backed by a temporary directory, removed on dispose.
    Disposable(tempfile::TempDir),
    /// Backed by a caller-supplied directory, left in place on dispose.
    Persistent(PathBuf),
}

impl Backing {
    fn path(&self) -> PathBuf {
        match self {
            Backing::Disposable(dir) => dir.path().to_path_buf(),
            Backing::Persistent(path) => path.clone(),
        }
    }
}

struct Collections {
    documents: HashMap<String, Document>,
    pages: HashMap<String, Page>,
    page_nodes: HashMap<String, PageNode>,
    toc_entries: HashMap<String, TocEntry>,
    entities: HashMap<String, Entity>,
    relationships: HashMap<String, Relationship>,
    claims: HashMap<String, Claim>,
    messages: HashMap<String, Message>,
    learnings: HashMap<String, Learning>,
}

impl Collections {
    fn empty() -> Self {
        Self {
            documents: HashMap::new(),
            pages: HashMap::new(),
            page_nodes: HashMap::new(),
            toc_entries: HashMap::new(),
            entities: HashMap::new(),
            relationships: HashMap::new(),
            claims: HashMap::new(),
            messages: HashMap::new(),
            learnings: HashMap::new(),
        }
    }

    fn from_snapshot(s: Snapshot) -> Self {
        Self {
            documents: s.documents,
            pages: s.pages,
            page_nodes: s.page_nodes,
            toc_entries: s.toc_entries,
            entities: s.entities,
            relationships: s.relationships,
            claims: s.claims,
            messages: s.messages,
            learnings: s.learnings,
        }
    }

    fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            documents: self.documents.clone(),
            pages: self.pages.clone(),
            page_nodes: self.page_nodes.clone(),
            toc_entries: self.toc_entries.clone(),
            entities: self.entities.clone(),
            relationships: self.relationships.clone(),
            claims: self.claims.clone(),
            messages: self.messages.clone(),
            learnings: self.learnings.clone(),
        }
    }
}

/// The process-local typed multi-collection knowledge store.
///
/// All mutators serialize through a single `tokio::sync::RwLock` write
/// guard, satisfying the "single-writer per process" invariant (data
/// model §3) without a separate mutex.
pub struct Store {
    backing: Backing,
    config: StoreConfig,
    inner: RwLock<Collections>,
    dirty: AtomicBool,
}

impl Store {
    /// Open a disposable store backed by a fresh temporary directory.
    /// The directory (and any flushed snapshot in it) is removed when
    /// the returned store is dropped.
    pub fn open_disposable(config: StoreConfig) -> Result<Self, StoreError> {
        let dir = tempfile::tempdir().map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(Self {
            backing: Backing::Disposable(dir),
            config,
            inner: RwLock::new(Collections::empty()),
            dirty: AtomicBool::new(false),
        })
    }

    /// Open a persistent store rooted at `dir`, loading any prior
    /// snapshot found there. If the snapshot exists but fails to parse,
    /// the failure is logged and the store starts empty (per the
    /// restart contract in §4.1).
    pub async fn open_persistent(dir: PathBuf, config: StoreConfig) -> Result<Self, StoreError> {
        let snapshot_path = dir.join(SNAPSHOT_FILE_NAME);
        let collections = match tokio::fs::read_to_string(&snapshot_path).await {
            Ok(contents) => match serde_json::from_str::<Snapshot>(&contents) {
                Ok(snapshot) => Collections::from_snapshot(snapshot),
                Err(e) => {
                    tracing::warn!(
                        path = %snapshot_path.display(),
                        error = %e,
                        "snapshot parse failed, starting empty"
                    );
                    Collections::empty()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collections::empty(),
            Err(e) => {
                tracing::warn!(
                    path = %snapshot_path.display(),
                    error = %e,
                    "snapshot read failed, starting empty"
                );
                Collections::empty()
            }
        };
        Ok(Self {
            backing: Backing::Persistent(dir),
            config,
            inner: RwLock::new(collections),
            dirty: AtomicBool::new(false),
        })
    }

    /// Whether the store has unflushed mutations.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// The directory this store is backed by.
    pub fn root_path(&self) -> PathBuf {
        self.backing.path()
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Atomically write the snapshot file, creating parent directories
    /// if absent, and clear the dirty flag on success. On failure the
    /// dirty flag is left set so a later flush can retry (§4.1 failure
    /// model).
    #[tracing::instrument(skip(self))]
    pub async fn flush_now(&self) -> Result<(), StoreError> {
        let root = self.backing.path();
        let snapshot = {
            let guard = self.inner.read().await;
            guard.to_snapshot()
        };
        let contents = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        if let Err(e) = tokio::fs::create_dir_all(&root).await {
            tracing::warn!(error = %e, "flush failed creating store directory");
            return Err(StoreError::FlushFailed(e.to_string()));
        }
        let path = root.join(SNAPSHOT_FILE_NAME);
        match tokio::fs::write(&path, contents).await {
            Ok(()) => {
                self.dirty.store(false, Ordering::Release);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "flush failed");
                Err(StoreError::FlushFailed(e.to_string()))
            }
        }
    }

    /// Flush and, for disposable stores, release the backing directory.
    /// Persistent stores are left on disk.
    pub async fn dispose(self) -> Result<(), StoreError> {
        self.flush_now().await
        // `self.backing` drops here; `tempfile::TempDir::drop` removes
        // the directory for the disposable case.
    }

    // -- inserts (upsert on unique id) --------------------------------

    /// Insert or replace a document.
    pub async fn insert_document(&self, doc: Document) {
        let mut guard = self.inner.write().await;
        guard.documents.insert(doc.id.clone(), doc);
        drop(guard);
        self.mark_dirty();
    }

    /// Insert or replace a page.
    pub async fn insert_page(&self, page: Page) {
        let mut guard = self.inner.write().await;
        guard.pages.insert(page.id.clone(), page);
        drop(guard);
        self.mark_dirty();
    }

    /// Insert or replace a page node. Refuses image/table blobs above
    /// the configured size cap: the record is still stored, but without
    /// the image blob, and a warning is logged (§4.1 large-binary
    /// policy — a hard contract, not a heuristic).
    pub async fn insert_page_node(&self, mut node: PageNode) {
        if let Some(bytes) = &node.image_bytes {
            if bytes.len() > self.config.max_image_bytes {
                tracing::warn!(
                    node_id = %node.id,
                    size = bytes.len(),
                    max = self.config.max_image_bytes,
                    "image exceeds max size, storing node without image bytes"
                );
                node.image_bytes = None;
            }
        }
        let mut guard = self.inner.write().await;
        guard.page_nodes.insert(node.id.clone(), node);
        drop(guard);
        self.mark_dirty();
    }

    /// Insert or replace a TOC entry.
    pub async fn insert_toc_entry(&self, entry: TocEntry) {
        let mut guard = self.inner.write().await;
        guard.toc_entries.insert(entry.id.clone(), entry);
        drop(guard);
        self.mark_dirty();
    }

    /// Insert or replace an entity.
    pub async fn insert_entity(&self, entity: Entity) {
        let mut guard = self.inner.write().await;
        guard.entities.insert(entity.id.clone(), entity);
        drop(guard);
        self.mark_dirty();
    }

    /// Insert or replace a relationship. Fails if either endpoint does
    /// not resolve to an existing entity (data model §3: "must resolve
    /// to existing entities at write time").
    pub async fn insert_relationship(&self, rel: Relationship) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        if !guard.entities.contains_key(&rel.source_entity_id) {
            return Err(StoreError::UnresolvedEntity(rel.source_entity_id.clone()));
        }
        if !guard.entities.contains_key(&rel.target_entity_id) {
            return Err(StoreError::UnresolvedEntity(rel.target_entity_id.clone()));
        }
        guard.relationships.insert(rel.id.clone(), rel);
        drop(guard);
        self.mark_dirty();
        Ok(())
    }

    /// Insert or replace a claim.
    pub async fn insert_claim(&self, claim: Claim) {
        let mut guard = self.inner.write().await;
        guard.claims.insert(claim.id.clone(), claim);
        drop(guard);
        self.mark_dirty();
    }

    /// Insert or replace a message.
    pub async fn insert_message(&self, message: Message) {
        let mut guard = self.inner.write().await;
        guard.messages.insert(message.id.clone(), message);
        drop(guard);
        self.mark_dirty();
    }

    /// Insert or replace a learning.
    pub async fn insert_learning(&self, learning: Learning) {
        let mut guard = self.inner.write().await;
        guard.learnings.insert(learning.id.clone(), learning);
        drop(guard);
        self.mark_dirty();
    }

    // -- get by id -----------------------------------------------------

    /// Fetch a document by id.
    pub async fn get_document(&self, id: &str) -> Option<Document> {
        self.inner.read().await.documents.get(id).cloned()
    }

    /// Fetch a page by id.
    pub async fn get_page(&self, id: &str) -> Option<Page> {
        self.inner.read().await.pages.get(id).cloned()
    }

    /// Fetch a page node by id.
    pub async fn get_page_node(&self, id: &str) -> Option<PageNode> {
        self.inner.read().await.page_nodes.get(id).cloned()
    }

    /// Fetch a TOC entry by id.
    pub async fn get_toc_entry(&self, id: &str) -> Option<TocEntry> {
        self.inner.read().await.toc_entries.get(id).cloned()
    }

    /// Fetch an entity by id.
    pub async fn get_entity(&self, id: &str) -> Option<Entity> {
        self.inner.read().await.entities.get(id).cloned()
    }

    /// Fetch a relationship by id.
    pub async fn get_relationship(&self, id: &str) -> Option<Relationship> {
        self.inner.read().await.relationships.get(id).cloned()
    }

    /// Fetch a claim by id.
    pub async fn get_claim(&self, id: &str) -> Option<Claim> {
        self.inner.read().await.claims.get(id).cloned()
    }

    /// Fetch a message by id.
    pub async fn get_message(&self, id: &str) -> Option<Message> {
        self.inner.read().await.messages.get(id).cloned()
    }

    /// Fetch a learning by id.
    pub async fn get_learning(&self, id: &str) -> Option<Learning> {
        self.inner.read().await.learnings.get(id).cloned()
    }

    // -- search / list ---------------------------------------------------

    /// Search or list page nodes. When `query` is absent or blank this
    /// degrades to "list with filters"; otherwise performs a
    /// case-insensitive substring match over content + description.
    pub async fn search_page_nodes(
        &self,
        query: Option<&str>,
        filter: PageNodeFilter,
    ) -> Vec<PageNode> {
        let guard = self.inner.read().await;
        let mut out: Vec<PageNode> = guard
            .page_nodes
            .values()
            .filter(|n| match &filter.document_id {
                Some(doc) => &n.document_id == doc,
                None => true,
            })
            .filter(|n| match &filter.r#type {
                Some(t) => node_type_tag(n.r#type) == t,
                None => true,
            })
            .filter(|n| match blank_to_none(query) {
                Some(q) => substring_match(&n.searchable_text(), q),
                None => true,
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out.truncate(filter.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
        out
    }

    /// Search or list TOC entries; same degrade-to-list semantics as
    /// [`Store::search_page_nodes`].
    pub async fn search_toc_entries(
        &self,
        query: Option<&str>,
        filter: TocEntryFilter,
    ) -> Vec<TocEntry> {
        let guard = self.inner.read().await;
        let mut out: Vec<TocEntry> = guard
            .toc_entries
            .values()
            .filter(|e| match &filter.document_id {
                Some(doc) => &e.document_id == doc,
                None => true,
            })
            .filter(|e| match blank_to_none(query) {
                Some(q) => substring_match(&e.searchable_text(), q),
                None => true,
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.target_page, &a.id).cmp(&(b.target_page, &b.id)));
        out.truncate(filter.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
        out
    }

    /// Search or list entities; same degrade-to-list semantics as
    /// [`Store::search_page_nodes`].
    pub async fn search_entities(&self, query: Option<&str>, filter: EntityFilter) -> Vec<Entity> {
        let guard = self.inner.read().await;
        let mut out: Vec<Entity> = guard
            .entities
            .values()
            .filter(|e| match &filter.document_id {
                Some(doc) => &e.document_id == doc,
                None => true,
            })
            .filter(|e| match &filter.r#type {
                Some(t) => &e.r#type == t,
                None => true,
            })
            .filter(|e| match blank_to_none(query) {
                Some(q) => substring_match(&e.searchable_text(), q),
                None => true,
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out.truncate(filter.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
        out
    }

    /// Search or list documents. Documents have no dedicated textual
    /// search fields beyond name/title/abstract, searched the same way.
    pub async fn search_documents(
        &self,
        query: Option<&str>,
        filter: DocumentFilter,
    ) -> Vec<Document> {
        let guard = self.inner.read().await;
        let mut out: Vec<Document> = guard
            .documents
            .values()
            .filter(|d| match blank_to_none(query) {
                Some(q) => {
                    substring_match(&d.name, q)
                        || d.title.as_deref().is_some_and(|t| substring_match(t, q))
                        || d.r#abstract
                            .as_deref()
                            .is_some_and(|a| substring_match(a, q))
                }
                None => true,
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out.truncate(filter.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
        out
    }

    /// Search or list learnings. Decayed learnings are excluded unless
    /// `filter.include_decayed` is set (data model §3).
    pub async fn search_learnings(
        &self,
        query: Option<&str>,
        filter: LearningFilter,
    ) -> Vec<Learning> {
        let guard = self.inner.read().await;
        let mut out: Vec<Learning> = guard
            .learnings
            .values()
            .filter(|l| filter.include_decayed || !l.decayed())
            .filter(|l| match blank_to_none(query) {
                Some(q) => substring_match(&l.searchable_text(), q),
                None => true,
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out.truncate(filter.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
        out
    }

    // -- mutators --------------------------------------------------------

    /// Atomically increment a learning's vote counter, update
    /// `last_evaluated`, and re-derive `decayed` on read (decay is a
    /// computed property, not stored — see [`Learning::decayed`]).
    /// Returns `None` if no learning exists with this id.
    pub async fn vote_learning(&self, id: &str, vote: LearningVote) -> Option<Learning> {
        let mut guard = self.inner.write().await;
        let learning = guard.learnings.get_mut(id)?;
        match vote {
            LearningVote::Useful => learning.useful_count += 1,
            LearningVote::NotUseful => learning.not_useful_count += 1,
        }
        learning.last_evaluated = Some(chrono::Utc::now());
        let result = learning.clone();
        drop(guard);
        self.mark_dirty();
        Some(result)
    }

    /// Increment a learning's applied-count. Returns `None` if no
    /// learning exists with this id.
    pub async fn increment_applied_count(&self, id: &str) -> Option<Learning> {
        let mut guard = self.inner.write().await;
        let learning = guard.learnings.get_mut(id)?;
        learning.applied_count += 1;
        let result = learning.clone();
        drop(guard);
        self.mark_dirty();
        Some(result)
    }

    /// Type-count frequencies and vote/application totals.
    pub async fn stats(&self) -> StoreStats {
        let guard = self.inner.read().await;
        let mut page_node_counts_by_type = HashMap::new();
        for node in guard.page_nodes.values() {
            *page_node_counts_by_type
                .entry(node_type_tag(node.r#type).to_string())
                .or_insert(0usize) += 1;
        }
        let mut entity_counts_by_type = HashMap::new();
        for entity in guard.entities.values() {
            *entity_counts_by_type
                .entry(entity.r#type.clone())
                .or_insert(0usize) += 1;
        }
        let (mut useful, mut not_useful, mut applied, mut decayed) = (0u64, 0u64, 0u64, 0usize);
        for l in guard.learnings.values() {
            useful += l.useful_count as u64;
            not_useful += l.not_useful_count as u64;
            applied += l.applied_count as u64;
            if l.decayed() {
                decayed += 1;
            }
        }
        StoreStats {
            document_count: guard.documents.len(),
            page_count: guard.pages.len(),
            page_node_counts_by_type,
            toc_entry_count: guard.toc_entries.len(),
            entity_counts_by_type,
            relationship_count: guard.relationships.len(),
            claim_count: guard.claims.len(),
            message_count: guard.messages.len(),
            learning_count: guard.learnings.len(),
            decayed_learning_count: decayed,
            total_useful_votes: useful,
            total_not_useful_votes: not_useful,
            total_applied_count: applied,
        }
    }

    /// All messages ordered by timestamp (used to rebuild conversation
    /// history for the prompt builder / context reducer).
    pub async fn messages_ordered(&self) -> Vec<Message> {
        let guard = self.inner.read().await;
        let mut out: Vec<Message> = guard.messages.values().cloned().collect();
        out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.iteration.cmp(&b.iteration)));
        out
    }
}

fn node_type_tag(t: crate::records::PageNodeType) -> &'static str {
    use crate::records::PageNodeType::*;
    match t {
        Section => "section",
        Heading => "heading",
        Paragraph => "paragraph",
        ListItem => "list-item",
        Image => "image",
        Table => "table",
        Header => "header",
        Footer => "footer",
        Metadata => "metadata",
    }
}

fn blank_to_none(query: Option<&str>) -> Option<&str> {
    query.map(str::trim).filter(|q| !q.is_empty())
}

fn substring_match(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Document, PageNodeType};

    fn sample_node(id: &str, content: &str) -> PageNode {
        PageNode {
            id: id.to_string(),
            page_id: "doc-page-0".to_string(),
            document_id: "doc".to_string(),
            local_id: id.to_string(),
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

    #[tokio::test]
    async fn insert_is_upsert() {
        let store = Store::open_disposable(StoreConfig::default()).unwrap();
        store
            .insert_document(Document {
                id: "d1".into(),
                name: "a".into(),
                title: None,
                r#abstract: None,
                extension: "pdf".into(),
                author: None,
                created_at: None,
                updated_at: None,
            })
            .await;
        store
            .insert_document(Document {
                id: "d1".into(),
                name: "b".into(),
                title: None,
                r#abstract: None,
                extension: "pdf".into(),
                author: None,
                created_at: None,
                updated_at: None,
            })
            .await;
        let doc = store.get_document("d1").await.unwrap();
        assert_eq!(doc.name, "b");
        assert_eq!(store.stats().await.document_count, 1);
    }

    #[tokio::test]
    async fn blank_query_degrades_to_list() {
        let store = Store::open_disposable(StoreConfig::default()).unwrap();
        store.insert_page_node(sample_node("n1", "hello world")).await;
        store.insert_page_node(sample_node("n2", "goodbye")).await;
        let all = store
            .search_page_nodes(Some("   "), PageNodeFilter::default())
            .await;
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let store = Store::open_disposable(StoreConfig::default()).unwrap();
        store.insert_page_node(sample_node("n1", "Hello World")).await;
        store.insert_page_node(sample_node("n2", "goodbye")).await;
        let hits = store
            .search_page_nodes(Some("WORLD"), PageNodeFilter::default())
            .await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "n1");
    }

    #[tokio::test]
    async fn image_over_cap_is_refused_not_the_node() {
        let config = StoreConfig {
            max_image_bytes: 4,
        };
        let store = Store::open_disposable(config).unwrap();
        let mut node = sample_node("img1", "");
        node.r#type = PageNodeType::Image;
        node.content = None;
        node.image_bytes = Some(vec![0u8; 10]);
        store.insert_page_node(node).await;
        let stored = store.get_page_node("img1").await.unwrap();
        assert!(stored.image_bytes.is_none());
    }

    #[tokio::test]
    async fn relationship_requires_existing_entities() {
        let store = Store::open_disposable(StoreConfig::default()).unwrap();
        let rel = Relationship {
            id: "r1".into(),
            source_entity_id: "missing".into(),
            target_entity_id: "also-missing".into(),
            r#type: "references".into(),
            document_id: "doc".into(),
            description: None,
        };
        let result = store.insert_relationship(rel).await;
        assert!(matches!(result, Err(StoreError::UnresolvedEntity(_))));
    }

    #[tokio::test]
    async fn vote_learning_tracks_decay() {
        let store = Store::open_disposable(StoreConfig::default()).unwrap();
        store
            .insert_learning(Learning {
                id: "l1".into(),
                insight: "insight".into(),
                context: None,
                timestamp: chrono::Utc::now(),
                useful_count: 0,
                not_useful_count: 0,
                applied_count: 0,
                last_evaluated: None,
            })
            .await;
        for _ in 0..4 {
            store.vote_learning("l1", LearningVote::NotUseful).await;
        }
        store.vote_learning("l1", LearningVote::Useful).await;
        let learning = store.get_learning("l1").await.unwrap();
        assert!(learning.decayed());

        let visible = store
            .search_learnings(None, LearningFilter::default())
            .await;
        assert!(visible.is_empty());
        let all = store
            .search_learnings(
                None,
                LearningFilter {
                    include_decayed: true,
                    limit: None,
                },
            )
            .await;
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn flush_clears_dirty_and_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_persistent(dir.path().to_path_buf(), StoreConfig::default())
            .await
            .unwrap();
        store
            .insert_document(Document {
                id: "d1".into(),
                name: "a".into(),
                title: None,
                r#abstract: None,
                extension: "pdf".into(),
                author: None,
                created_at: None,
                updated_at: None,
            })
            .await;
        assert!(store.is_dirty());
        store.flush_now().await.unwrap();
        assert!(!store.is_dirty());

        let reopened = Store::open_persistent(dir.path().to_path_buf(), StoreConfig::default())
            .await
            .unwrap();
        assert!(reopened.get_document("d1").await.is_some());
    }

    #[tokio::test]
    async fn corrupt_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(SNAPSHOT_FILE_NAME), b"not json")
            .await
            .unwrap();
        let store = Store::open_persistent(dir.path().to_path_buf(), StoreConfig::default())
            .await
            .unwrap();
        assert_eq!(store.stats().await.document_count, 0);
    }
}
