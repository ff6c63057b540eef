use anyhow::Context;
use property_catalog::catalog::{
    BlobStorage, CatalogQueryEngine, CatalogStore, DocumentRegistry, FsBlobStorage, MemoryStore,
    PropertyFilter, PropertyService,
};
use property_catalog::config::{load_config, upload_dir};
use property_catalog::export::{ExportFormat, ExportPipeline, ExportRequest, ExportSelection};
use property_catalog::models::{
    AgentId, DealType, Detail, FileType, Language, NewProperty, Owner, PropertyStatus,
    PropertyType,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_AGENT: AgentId = 1;

fn demo_detail(
    language: Language,
    city: &str,
    address: &str,
    price: f64,
    rooms: i32,
    area: f64,
) -> Detail {
    Detail {
        language,
        city: city.to_string(),
        district: "Centar".to_string(),
        address: address.to_string(),
        heating_type: "central".to_string(),
        equipment: json!(["kitchen", "air_conditioning"]),
        description: format!("{} rooms, {} m2", rooms, area),
        floor_number: 2,
        total_floors: 5,
        living_area: area,
        rooms,
        bedrooms: (rooms - 1).max(1),
        bathrooms: 1,
        price,
        registered: true,
        water_supply: true,
        sewage: true,
        ..Default::default()
    }
}

/// Typical listings used to populate the in-memory catalog
fn demo_listings() -> Vec<NewProperty> {
    let owner = Owner {
        properties_count: 1,
        contract_status: "signed".to_string(),
        contract_number: "2024-001".to_string(),
        ..Default::default()
    };

    vec![
        NewProperty {
            property_type: PropertyType::House,
            deal_type: DealType::Sale,
            status: PropertyStatus::Ready,
            is_active: true,
            details: vec![
                demo_detail(
                    Language::Sr,
                    "Beograd",
                    "Bulevar oslobođenja 12",
                    185_000.0,
                    5,
                    160.0,
                ),
                demo_detail(
                    Language::En,
                    "Belgrade",
                    "12 Liberation Boulevard",
                    185_000.0,
                    5,
                    160.0,
                ),
                demo_detail(
                    Language::Ru,
                    "Белград",
                    "бул. Ослобождения 12",
                    185_000.0,
                    5,
                    160.0,
                ),
            ],
            owner: Some(owner.clone()),
        },
        NewProperty {
            property_type: PropertyType::Apartment,
            deal_type: DealType::Rent,
            status: PropertyStatus::New,
            is_active: true,
            details: vec![
                demo_detail(Language::Sr, "Novi Sad", "Zmaj Jovina 4", 650.0, 2, 54.0),
                demo_detail(Language::En, "Novi Sad", "4 Zmaj Jovina Street", 650.0, 2, 54.0),
            ],
            owner: Some(owner.clone()),
        },
        NewProperty {
            property_type: PropertyType::Office,
            deal_type: DealType::Rent,
            status: PropertyStatus::Shared,
            is_active: false,
            details: vec![demo_detail(Language::Sr, "Niš", "Obrenovićeva 30", 1_200.0, 4, 110.0)],
            owner: Some(owner),
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🏠 Property Catalog");
    info!("===================");

    let config = load_config()?;
    let language = match std::env::args().nth(1) {
        Some(tag) => tag.parse::<Language>()?,
        None => config.catalog.default_language,
    };

    let uploads = upload_dir(&config);
    tokio::fs::create_dir_all(&uploads)
        .await
        .with_context(|| format!("Failed to create upload dir {}", uploads.display()))?;

    let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
    let blobs: Arc<dyn BlobStorage> = Arc::new(FsBlobStorage::new(&uploads));
    info!("Files stored in {} ({})", uploads.display(), blobs.backend_name());

    let service =
        PropertyService::new(store.clone()).with_code_attempts(config.catalog.code_attempts);
    let registry = DocumentRegistry::new(store.clone(), blobs.clone());
    let engine = CatalogQueryEngine::new(store.clone());

    for listing in demo_listings() {
        let property = service.create(listing, DEMO_AGENT).await?;
        registry
            .attach(property.id, FileType::Image, "front.jpg", b"demo image", true)
            .await?;
        registry
            .attach(property.id, FileType::Document, "contract.pdf", b"demo contract", false)
            .await?;
    }

    let properties = engine.list(&PropertyFilter::default(), language).await?;
    info!("Listed {} properties in {}", properties.len(), language);

    for (i, property) in properties.iter().enumerate() {
        println!(
            "{}. {} / {} ({}, {})",
            i + 1,
            property.agent_code,
            property.property_code,
            property.property_type.as_str(),
            property.deal_type.as_str()
        );
        match property.detail(language) {
            Some(detail) => {
                println!("   {}, {}", detail.address, detail.city);
                println!(
                    "   {} rooms, {} m2, price {}",
                    detail.rooms, detail.living_area, detail.price
                );
            }
            None => println!("   (no {} translation)", language),
        }
        println!("   Active: {}", property.is_active);
        println!("   Public files: {}", property.documents.len());
        println!();
    }

    let json = serde_json::to_string_pretty(&properties)?;
    tokio::fs::write("catalog_listing.json", json).await?;
    info!("💾 Saved listing to catalog_listing.json");

    let pipeline = ExportPipeline::new(store, blobs, config.export.clone());
    let artifact = pipeline
        .export(&ExportRequest {
            selection: ExportSelection::Filter(PropertyFilter::default()),
            language,
            format: ExportFormat::Archive,
        })
        .await?;

    tokio::fs::write(&artifact.file_name, &artifact.bytes)
        .await
        .with_context(|| format!("Failed to write {}", artifact.file_name))?;
    info!(
        "💾 Saved export to {} ({} bytes, {} skipped items)",
        artifact.file_name,
        artifact.bytes.len(),
        artifact.skipped.len()
    );

    Ok(())
}
