use async_trait::async_trait;
use std::path::PathBuf;

use crate::catalog::types::{DocumentScope, PropertyQuery};
use crate::error::{StorageError, StoreError};
use crate::models::{
    Document, DocumentId, FileType, History, NewDocument, NewHistory, Owner, Property,
    PropertyId,
};

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence backend of the catalog
///
/// The query engine, services and export pipeline only talk to storage
/// through this trait, so backends can be swapped (in-memory for tests and
/// the demo binary, a database in production).
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Properties matching `query`, each with only the query language's detail
    /// row attached and no documents, owner or history.
    async fn find_properties(&self, query: &PropertyQuery) -> StoreResult<Vec<Property>>;

    async fn find_owner(&self, property_id: PropertyId) -> StoreResult<Option<Owner>>;

    async fn find_documents(
        &self,
        property_id: PropertyId,
        scope: DocumentScope,
    ) -> StoreResult<Vec<Document>>;

    async fn find_document(&self, id: DocumentId) -> StoreResult<Option<Document>>;

    async fn create_document(&self, document: NewDocument) -> StoreResult<Document>;

    /// Returns false when no such document existed.
    async fn delete_document(&self, id: DocumentId) -> StoreResult<bool>;

    /// Returns the number of rows changed (0 or 1).
    async fn update_document_visibility(
        &self,
        id: DocumentId,
        property_id: PropertyId,
        is_public: bool,
    ) -> StoreResult<u64>;

    /// History of a property, newest first.
    async fn find_history(&self, property_id: PropertyId) -> StoreResult<Vec<History>>;

    async fn begin(&self) -> StoreResult<Box<dyn CatalogTransaction>>;
}

/// Atomic unit of writes against the property aggregate
///
/// Nothing staged becomes visible until `commit` succeeds. Dropping the
/// transaction without committing discards every staged write.
#[async_trait]
pub trait CatalogTransaction: Send {
    /// Stores a new property with its details and owner and assigns its id.
    async fn insert_property(&mut self, property: Property) -> StoreResult<Property>;

    /// Replaces the property's columns, upserts the given detail rows per
    /// language and replaces the owner when one is supplied. Codes are kept.
    async fn save_property(&mut self, property: &Property) -> StoreResult<()>;

    /// Returns false when the property does not exist.
    async fn set_active(&mut self, id: PropertyId, is_active: bool) -> StoreResult<bool>;

    async fn append_history(&mut self, entry: NewHistory) -> StoreResult<History>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Raw file storage for uploaded documents
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Saves the bytes and returns the path relative to the storage root.
    async fn save(
        &self,
        bytes: &[u8],
        file_type: FileType,
        owner: PropertyId,
        original_name: &str,
    ) -> Result<String, StorageError>;

    async fn delete(&self, relative_path: &str) -> Result<(), StorageError>;

    async fn read(&self, relative_path: &str) -> Result<Vec<u8>, StorageError>;

    fn resolve_absolute_path(&self, relative_path: &str) -> Result<PathBuf, StorageError>;

    /// Get the name of the storage backend
    fn backend_name(&self) -> &'static str;
}
