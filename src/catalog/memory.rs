use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::debug;

use crate::catalog::traits::{CatalogStore, CatalogTransaction, StoreResult};
use crate::catalog::types::{DocumentScope, PropertyQuery};
use crate::error::StoreError;
use crate::models::{
    Detail, Document, DocumentId, History, Language, NewDocument, NewHistory, Owner, Property,
    PropertyId,
};

/// Store operations that can be made to fail on purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    FindProperties,
    FindOwner,
    FindDocuments,
    FindHistory,
    AppendHistory,
    Commit,
}

#[derive(Debug, Default, Clone)]
struct Tables {
    /// Property rows, relations stripped
    properties: BTreeMap<PropertyId, Property>,
    details: BTreeMap<(PropertyId, Language), Detail>,
    owners: BTreeMap<PropertyId, Owner>,
    documents: BTreeMap<DocumentId, Document>,
    history: Vec<History>,
}

impl Tables {
    fn code_taken(&self, property: &Property) -> bool {
        self.properties.values().any(|p| {
            p.id != property.id
                && (p.agent_code == property.agent_code
                    || p.property_code == property.property_code)
        })
    }

    fn apply(&mut self, write: Staged) -> StoreResult<()> {
        match write {
            Staged::Insert(mut property) => {
                if self.code_taken(&property) {
                    return Err(StoreError::Constraint(format!(
                        "duplicate property codes {} / {}",
                        property.agent_code, property.property_code
                    )));
                }
                for detail in property.details.drain(..) {
                    self.details.insert((property.id, detail.language), detail);
                }
                if let Some(owner) = property.owner.take() {
                    self.owners.insert(property.id, owner);
                }
                property.documents.clear();
                property.history.clear();
                self.properties.insert(property.id, property);
            }
            Staged::Save(property) => {
                let row = self
                    .properties
                    .get_mut(&property.id)
                    .ok_or_else(|| StoreError::Missing(format!("property {}", property.id)))?;
                row.property_type = property.property_type;
                row.deal_type = property.deal_type;
                row.status = property.status;
                row.is_active = property.is_active;
                row.updated_at = property.updated_at;
                for detail in property.details {
                    self.details.insert((property.id, detail.language), detail);
                }
                if let Some(owner) = property.owner {
                    self.owners.insert(property.id, owner);
                }
            }
            Staged::SetActive(id, is_active, at) => {
                let row = self
                    .properties
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::Missing(format!("property {id}")))?;
                row.is_active = is_active;
                row.updated_at = at;
            }
            Staged::History(entry) => {
                if !self.properties.contains_key(&entry.property_id) {
                    return Err(StoreError::Missing(format!(
                        "property {}",
                        entry.property_id
                    )));
                }
                self.history.push(entry);
            }
        }
        Ok(())
    }
}

struct Inner {
    tables: RwLock<Tables>,
    next_property_id: AtomicU64,
    next_document_id: AtomicU64,
    next_history_id: AtomicU64,
    failures: Mutex<HashSet<FailPoint>>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            next_property_id: AtomicU64::new(1),
            next_document_id: AtomicU64::new(1),
            next_history_id: AtomicU64::new(1),
            failures: Mutex::new(HashSet::new()),
        }
    }
}

impl Inner {
    fn check(&self, point: FailPoint) -> StoreResult<()> {
        let failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        if failures.contains(&point) {
            return Err(StoreError::Backend(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

/// Process-local catalog store
///
/// Clones share the same tables. Ids are allocated like database sequences:
/// a rolled back insert still consumes its id.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of the given operation fail with a backend error
    pub fn fail_on(&self, point: FailPoint) {
        self.inner
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(point);
    }

    pub fn clear_failures(&self) {
        self.inner
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_properties(&self, query: &PropertyQuery) -> StoreResult<Vec<Property>> {
        self.inner.check(FailPoint::FindProperties)?;
        let tables = self.inner.tables.read().await;

        let mut found = Vec::new();
        for row in tables.properties.values() {
            if !query.admits(row) {
                continue;
            }

            let detail = tables.details.get(&(row.id, query.language));
            if let Some(predicate) = &query.detail {
                match detail {
                    Some(d) if predicate.matches(d) => {}
                    _ => continue,
                }
            }

            let mut property = row.clone();
            property.details = detail.cloned().into_iter().collect();
            found.push(property);
        }

        debug!("Memory store matched {} properties", found.len());
        Ok(found)
    }

    async fn find_owner(&self, property_id: PropertyId) -> StoreResult<Option<Owner>> {
        self.inner.check(FailPoint::FindOwner)?;
        let tables = self.inner.tables.read().await;
        Ok(tables.owners.get(&property_id).cloned())
    }

    async fn find_documents(
        &self,
        property_id: PropertyId,
        scope: DocumentScope,
    ) -> StoreResult<Vec<Document>> {
        self.inner.check(FailPoint::FindDocuments)?;
        let tables = self.inner.tables.read().await;
        Ok(tables
            .documents
            .values()
            .filter(|d| d.property_id == property_id && scope.admits(d.is_public))
            .cloned()
            .collect())
    }

    async fn find_document(&self, id: DocumentId) -> StoreResult<Option<Document>> {
        let tables = self.inner.tables.read().await;
        Ok(tables.documents.get(&id).cloned())
    }

    async fn create_document(&self, document: NewDocument) -> StoreResult<Document> {
        let mut tables = self.inner.tables.write().await;
        if !tables.properties.contains_key(&document.property_id) {
            return Err(StoreError::Missing(format!(
                "property {}",
                document.property_id
            )));
        }

        let created = Document {
            id: self.inner.next_document_id.fetch_add(1, Ordering::SeqCst),
            property_id: document.property_id,
            file_type: document.file_type,
            file_path: document.file_path,
            is_public: document.is_public,
            created_at: Utc::now(),
        };
        tables.documents.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_document(&self, id: DocumentId) -> StoreResult<bool> {
        let mut tables = self.inner.tables.write().await;
        Ok(tables.documents.remove(&id).is_some())
    }

    async fn update_document_visibility(
        &self,
        id: DocumentId,
        property_id: PropertyId,
        is_public: bool,
    ) -> StoreResult<u64> {
        let mut tables = self.inner.tables.write().await;
        match tables.documents.get_mut(&id) {
            Some(doc) if doc.property_id == property_id => {
                doc.is_public = is_public;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn find_history(&self, property_id: PropertyId) -> StoreResult<Vec<History>> {
        self.inner.check(FailPoint::FindHistory)?;
        let tables = self.inner.tables.read().await;
        let mut entries: Vec<History> = tables
            .history
            .iter()
            .filter(|h| h.property_id == property_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            b.action_date
                .cmp(&a.action_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(entries)
    }

    async fn begin(&self) -> StoreResult<Box<dyn CatalogTransaction>> {
        Ok(Box::new(MemoryTransaction {
            inner: Arc::clone(&self.inner),
            staged: Vec::new(),
        }))
    }
}

enum Staged {
    Insert(Property),
    Save(Property),
    SetActive(PropertyId, bool, DateTime<Utc>),
    History(History),
}

/// Buffers writes and applies them all-or-nothing on commit
pub struct MemoryTransaction {
    inner: Arc<Inner>,
    staged: Vec<Staged>,
}

impl MemoryTransaction {
    async fn property_exists(&self, id: PropertyId) -> bool {
        let staged = self
            .staged
            .iter()
            .any(|w| matches!(w, Staged::Insert(p) if p.id == id));
        staged || self.inner.tables.read().await.properties.contains_key(&id)
    }
}

#[async_trait]
impl CatalogTransaction for MemoryTransaction {
    async fn insert_property(&mut self, mut property: Property) -> StoreResult<Property> {
        let codes_staged = self.staged.iter().any(|w| {
            matches!(w, Staged::Insert(p)
                if p.agent_code == property.agent_code || p.property_code == property.property_code)
        });
        if codes_staged || self.inner.tables.read().await.code_taken(&property) {
            return Err(StoreError::Constraint(format!(
                "duplicate property codes {} / {}",
                property.agent_code, property.property_code
            )));
        }

        property.id = self.inner.next_property_id.fetch_add(1, Ordering::SeqCst);
        self.staged.push(Staged::Insert(property.clone()));
        Ok(property)
    }

    async fn save_property(&mut self, property: &Property) -> StoreResult<()> {
        if !self.property_exists(property.id).await {
            return Err(StoreError::Missing(format!("property {}", property.id)));
        }
        self.staged.push(Staged::Save(property.clone()));
        Ok(())
    }

    async fn set_active(&mut self, id: PropertyId, is_active: bool) -> StoreResult<bool> {
        if !self.property_exists(id).await {
            return Ok(false);
        }
        self.staged.push(Staged::SetActive(id, is_active, Utc::now()));
        Ok(true)
    }

    async fn append_history(&mut self, entry: NewHistory) -> StoreResult<History> {
        self.inner.check(FailPoint::AppendHistory)?;
        let history = History {
            id: self.inner.next_history_id.fetch_add(1, Ordering::SeqCst),
            property_id: entry.property_id,
            action_type: entry.action_type,
            action_date: Utc::now(),
            agent_id: entry.agent_id,
            details: entry.details,
        };
        self.staged.push(Staged::History(history.clone()));
        Ok(history)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.inner.check(FailPoint::Commit)?;
        let MemoryTransaction { inner, staged } = *self;

        let mut tables = inner.tables.write().await;
        let mut next = tables.clone();
        for write in staged {
            next.apply(write)?;
        }
        *tables = next;
        Ok(())
    }
}
