use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::traits::CatalogStore;
use crate::catalog::types::{DocumentScope, PropertyFilter, PropertyQuery};
use crate::error::{CatalogError, CatalogResult, StoreContext};
use crate::models::{Language, Property, PropertyId};

/// Builds and runs localized property listings
#[derive(Clone)]
pub struct CatalogQueryEngine {
    store: Arc<dyn CatalogStore>,
}

impl CatalogQueryEngine {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Filtered listing for general consumption: one detail row in
    /// `language` and public documents only.
    pub async fn list(
        &self,
        filter: &PropertyFilter,
        language: Language,
    ) -> CatalogResult<Vec<Property>> {
        let query = filter.to_query(language)?;
        debug!(
            "Listing properties (language={}, detail join={})",
            language,
            query.detail.is_some()
        );

        let mut properties = self
            .store
            .find_properties(&query)
            .await
            .context("fetching properties")?;

        for property in &mut properties {
            self.attach_public_documents(property).await;
        }

        info!("Listed {} properties", properties.len());
        Ok(properties)
    }

    pub async fn get(&self, id: PropertyId, language: Language) -> CatalogResult<Property> {
        if id == 0 {
            return Err(CatalogError::Validation("invalid property id".to_string()));
        }
        debug!("Fetching property {}", id);

        let mut property = self
            .store
            .find_properties(&PropertyQuery::by_ids(vec![id], language))
            .await
            .with_context(|| format!("fetching property {id}"))?
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::not_found("property", id))?;

        self.attach_public_documents(&mut property).await;
        Ok(property)
    }

    /// Privileged listing used by export: every document regardless of
    /// visibility plus the owner record.
    pub async fn list_by_ids(
        &self,
        ids: &[PropertyId],
        language: Language,
    ) -> CatalogResult<Vec<Property>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.contains(&0) {
            return Err(CatalogError::Validation("invalid property id".to_string()));
        }

        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let mut properties = self
            .store
            .find_properties(&PropertyQuery::by_ids(unique, language))
            .await
            .context("fetching properties by id")?;

        for property in &mut properties {
            property.documents = self
                .store
                .find_documents(property.id, DocumentScope::All)
                .await
                .with_context(|| format!("fetching documents of property {}", property.id))?;
            property.owner = self
                .store
                .find_owner(property.id)
                .await
                .with_context(|| format!("fetching owner of property {}", property.id))?;
        }

        Ok(properties)
    }

    /// A failed lookup leaves the list empty rather than failing the read
    async fn attach_public_documents(&self, property: &mut Property) {
        match self
            .store
            .find_documents(property.id, DocumentScope::PublicOnly)
            .await
        {
            Ok(documents) => property.documents = documents,
            Err(e) => {
                warn!("Could not load documents for property {}: {}", property.id, e);
                property.documents.clear();
            }
        }
    }
}
