//! Shared setup for catalog and export tests.

use std::sync::Arc;
use tempfile::TempDir;

use crate::catalog::blob::FsBlobStorage;
use crate::catalog::documents::DocumentRegistry;
use crate::catalog::memory::MemoryStore;
use crate::catalog::properties::PropertyService;
use crate::catalog::query::CatalogQueryEngine;
use crate::catalog::traits::{BlobStorage, CatalogStore};
use crate::models::{
    AgentId, DealType, Detail, Document, FileType, Language, NewProperty, Owner, Property,
    PropertyId, PropertyStatus, PropertyType,
};

pub const AGENT: AgentId = 7;

pub fn detail(language: Language, city: &str, price: f64, rooms: i32, area: f64) -> Detail {
    Detail {
        language,
        city: city.to_string(),
        district: "Centar".to_string(),
        address: format!("{city} 1"),
        heating_type: "central".to_string(),
        price,
        rooms,
        living_area: area,
        bedrooms: (rooms - 1).max(0),
        bathrooms: 1,
        total_floors: 4,
        floor_number: 2,
        registered: true,
        water_supply: true,
        ..Default::default()
    }
}

pub fn new_property(
    property_type: PropertyType,
    deal_type: DealType,
    details: Vec<Detail>,
) -> NewProperty {
    NewProperty {
        property_type,
        deal_type,
        status: PropertyStatus::New,
        is_active: true,
        details,
        owner: Some(Owner {
            properties_count: 1,
            contract_status: "signed".to_string(),
            contract_number: "C-100".to_string(),
            contract_end_date: None,
            contract_file_path: None,
        }),
    }
}

/// In-memory catalog with a temporary upload directory
pub struct Seeded {
    pub store: MemoryStore,
    pub blobs: Arc<FsBlobStorage>,
    pub engine: CatalogQueryEngine,
    pub service: PropertyService,
    pub registry: DocumentRegistry,
    _uploads: TempDir,
}

impl Seeded {
    pub async fn new() -> Self {
        let uploads = tempfile::tempdir().expect("temp upload dir");
        let store = MemoryStore::new();
        let blobs = Arc::new(FsBlobStorage::new(uploads.path()));

        let shared: Arc<dyn CatalogStore> = Arc::new(store.clone());
        let blob_handle: Arc<dyn BlobStorage> = blobs.clone();

        Self {
            engine: CatalogQueryEngine::new(shared.clone()),
            service: PropertyService::new(shared.clone()),
            registry: DocumentRegistry::new(shared, blob_handle),
            store,
            blobs,
            _uploads: uploads,
        }
    }

    pub async fn create(&self, new: NewProperty) -> Property {
        self.service.create(new, AGENT).await.expect("create property")
    }

    pub async fn deactivate(&self, id: PropertyId) {
        self.service
            .set_status(id, false, AGENT)
            .await
            .expect("deactivate property");
    }

    pub async fn document(&self, id: PropertyId, file_type: FileType, is_public: bool) -> Document {
        let name = match file_type {
            FileType::Image => "photo.jpg",
            FileType::Video => "tour.mp4",
            FileType::Document => "contract.pdf",
        };
        let body = format!("{} of property {}", file_type.as_str(), id);
        self.registry
            .attach(id, file_type, name, body.as_bytes(), is_public)
            .await
            .expect("attach document")
    }
}
