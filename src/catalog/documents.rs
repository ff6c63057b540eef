use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::traits::{BlobStorage, CatalogStore};
use crate::catalog::types::{DocumentScope, PropertyQuery};
use crate::error::{CatalogError, CatalogResult, StoreContext};
use crate::models::{Document, DocumentId, FileType, Language, NewDocument, PropertyId};

/// Uploaded files of a property and their visibility
#[derive(Clone)]
pub struct DocumentRegistry {
    store: Arc<dyn CatalogStore>,
    blobs: Arc<dyn BlobStorage>,
}

impl DocumentRegistry {
    pub fn new(store: Arc<dyn CatalogStore>, blobs: Arc<dyn BlobStorage>) -> Self {
        Self { store, blobs }
    }

    async fn ensure_property(&self, property_id: PropertyId) -> CatalogResult<()> {
        if property_id == 0 {
            return Err(CatalogError::Validation("invalid property id".to_string()));
        }
        let found = self
            .store
            .find_properties(&PropertyQuery::by_ids(vec![property_id], Language::default()))
            .await
            .with_context(|| format!("checking property {property_id}"))?;
        if found.is_empty() {
            return Err(CatalogError::not_found("property", property_id));
        }
        Ok(())
    }

    async fn owned_document(
        &self,
        property_id: PropertyId,
        document_id: DocumentId,
    ) -> CatalogResult<Document> {
        let document = self
            .store
            .find_document(document_id)
            .await
            .with_context(|| format!("loading document {document_id}"))?
            .ok_or_else(|| CatalogError::not_found("document", document_id))?;

        if document.property_id != property_id {
            return Err(CatalogError::Permission(format!(
                "document {} does not belong to property {}",
                document_id, property_id
            )));
        }
        Ok(document)
    }

    /// Saves the file and registers it; the file is removed again when
    /// registration fails.
    pub async fn attach(
        &self,
        property_id: PropertyId,
        file_type: FileType,
        file_name: &str,
        bytes: &[u8],
        is_public: bool,
    ) -> CatalogResult<Document> {
        if !file_type.accepts(file_name) {
            return Err(CatalogError::Validation(format!(
                "{} is not an allowed {} file (allowed: {})",
                file_name,
                file_type.as_str(),
                file_type.allowed_extensions().join(", ")
            )));
        }
        self.ensure_property(property_id).await?;

        let file_path = self
            .blobs
            .save(bytes, file_type, property_id, file_name)
            .await?;

        let registered = self
            .store
            .create_document(NewDocument {
                property_id,
                file_type,
                file_path: file_path.clone(),
                is_public,
            })
            .await;

        match registered {
            Ok(document) => {
                info!(
                    "Attached {} {} to property {}",
                    file_type.as_str(),
                    document.file_path,
                    property_id
                );
                Ok(document)
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&file_path).await {
                    warn!("Could not remove orphaned file {}: {}", file_path, cleanup);
                }
                Err(e).context("registering document")
            }
        }
    }

    pub async fn remove(
        &self,
        property_id: PropertyId,
        document_id: DocumentId,
    ) -> CatalogResult<()> {
        let document = self.owned_document(property_id, document_id).await?;

        self.blobs.delete(&document.file_path).await?;
        self.store
            .delete_document(document_id)
            .await
            .with_context(|| format!("deleting document {document_id}"))?;

        info!("Removed document {} of property {}", document_id, property_id);
        Ok(())
    }

    pub async fn set_visibility(
        &self,
        property_id: PropertyId,
        document_id: DocumentId,
        is_public: bool,
    ) -> CatalogResult<()> {
        self.owned_document(property_id, document_id).await?;

        let changed = self
            .store
            .update_document_visibility(document_id, property_id, is_public)
            .await
            .with_context(|| format!("updating visibility of document {document_id}"))?;
        if changed == 0 {
            return Err(CatalogError::not_found("document", document_id));
        }
        Ok(())
    }

    /// Every document of the property, private ones included
    pub async fn list_all(&self, property_id: PropertyId) -> CatalogResult<Vec<Document>> {
        self.store
            .find_documents(property_id, DocumentScope::All)
            .await
            .with_context(|| format!("loading documents of property {property_id}"))
    }
}
