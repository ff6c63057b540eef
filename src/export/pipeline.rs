use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::query::CatalogQueryEngine;
use crate::catalog::traits::{BlobStorage, CatalogStore};
use crate::catalog::types::PropertyFilter;
use crate::config::ExportConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::export::archive::{document_entry_name, history_entry_name, ArchiveWriter};
use crate::export::spreadsheet::{build_sheets, write_workbook};
use crate::export::transcript::render_history;
use crate::models::{Document, DocumentId, Language, Property, PropertyId};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Which properties to export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportSelection {
    /// Matched through the public listing, then loaded in full like `Ids`
    Filter(PropertyFilter),
    /// Privileged: callers must have authorized access to these ids
    Ids(Vec<PropertyId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Spreadsheet,
    /// Spreadsheet plus per-property files and history in a zip
    Archive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub selection: ExportSelection,
    #[serde(default)]
    pub language: Language,
    pub format: ExportFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// No detail row in the export language; left out of the spreadsheet only
    MissingDetail(Language),
    FileUnavailable {
        document_id: DocumentId,
        path: String,
        error: String,
    },
    /// The file was read but could not be written into the zip
    ArchiveEntryFailed {
        document_id: DocumentId,
        error: String,
    },
    HistoryLookupFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedItem {
    pub property_id: PropertyId,
    pub reason: SkipReason,
}

/// Items left out of an export that otherwise succeeded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkipReport {
    items: Vec<SkippedItem>,
}

impl SkipReport {
    fn record(&mut self, property_id: PropertyId, reason: SkipReason) {
        self.items.push(SkippedItem {
            property_id,
            reason,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[SkippedItem] {
        &self.items
    }

    pub fn for_property(&self, property_id: PropertyId) -> impl Iterator<Item = &SkipReason> {
        self.items
            .iter()
            .filter(move |item| item.property_id == property_id)
            .map(|item| &item.reason)
    }
}

#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: &'static str,
    pub skipped: SkipReport,
}

/// Turns a property selection into a spreadsheet or a zip bundle
pub struct ExportPipeline {
    engine: CatalogQueryEngine,
    store: Arc<dyn CatalogStore>,
    blobs: Arc<dyn BlobStorage>,
    config: ExportConfig,
}

impl ExportPipeline {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        blobs: Arc<dyn BlobStorage>,
        config: ExportConfig,
    ) -> Self {
        Self {
            engine: CatalogQueryEngine::new(store.clone()),
            store,
            blobs,
            config,
        }
    }

    pub async fn export(&self, request: &ExportRequest) -> CatalogResult<ExportArtifact> {
        let language = request.language;
        let properties = self.resolve(&request.selection, language).await?;
        info!(
            "Exporting {} properties as {:?} (language={})",
            properties.len(),
            request.format,
            language
        );

        let mut skipped = SkipReport::default();
        for property in properties.iter().filter(|p| p.detail(language).is_none()) {
            debug!(
                "Property {} has no {} detail, leaving it out of the spreadsheet",
                property.id, language
            );
            skipped.record(property.id, SkipReason::MissingDetail(language));
        }

        let sheets = build_sheets(&properties, language);
        let workbook = write_workbook(&sheets, self.config.column_width)?;

        let date = Utc::now().format("%Y-%m-%d");
        let (bytes, file_name, content_type) = match request.format {
            ExportFormat::Spreadsheet => (
                workbook,
                format!("properties_export_{date}.xlsx"),
                XLSX_CONTENT_TYPE,
            ),
            ExportFormat::Archive => {
                let bytes = self.archive(&properties, workbook, &mut skipped).await?;
                (bytes, format!("properties_export_{date}.zip"), ZIP_CONTENT_TYPE)
            }
        };

        self.check_size(bytes.len())?;
        if !skipped.is_empty() {
            warn!("Export finished with {} skipped items", skipped.len());
        }

        Ok(ExportArtifact {
            bytes,
            file_name,
            content_type,
            skipped,
        })
    }

    /// Both selections end up loaded through `list_by_ids`, so rows always
    /// carry the owner and every document
    async fn resolve(
        &self,
        selection: &ExportSelection,
        language: Language,
    ) -> CatalogResult<Vec<Property>> {
        let ids: Vec<PropertyId> = match selection {
            ExportSelection::Ids(ids) => ids.clone(),
            ExportSelection::Filter(filter) => self
                .engine
                .list(filter, language)
                .await?
                .iter()
                .map(|p| p.id)
                .collect(),
        };

        let properties = if ids.is_empty() {
            Vec::new()
        } else {
            self.engine.list_by_ids(&ids, language).await?
        };

        if properties.is_empty() {
            return Err(CatalogError::NoPropertiesFound);
        }
        Ok(properties)
    }

    async fn archive(
        &self,
        properties: &[Property],
        workbook: Vec<u8>,
        skipped: &mut SkipReport,
    ) -> CatalogResult<Vec<u8>> {
        let mut archive = ArchiveWriter::new();
        archive.add_file(&self.config.spreadsheet_name, &workbook)?;

        for property in properties {
            for document in &property.documents {
                self.add_document(&mut archive, property, document, skipped)
                    .await;
            }

            match self.store.find_history(property.id).await {
                Ok(entries) => {
                    let transcript = render_history(property, &entries);
                    archive.add_file(&history_entry_name(property), transcript.as_bytes())?;
                }
                Err(e) => {
                    warn!("Skipping history of property {}: {}", property.id, e);
                    skipped.record(property.id, SkipReason::HistoryLookupFailed(e.to_string()));
                }
            }
        }

        debug!(
            "Archive assembled with {} entries via {} storage",
            archive.entries(),
            self.blobs.backend_name()
        );
        Ok(archive.finish()?)
    }

    async fn add_document(
        &self,
        archive: &mut ArchiveWriter,
        property: &Property,
        document: &Document,
        skipped: &mut SkipReport,
    ) {
        match self.blobs.read(&document.file_path).await {
            Ok(bytes) => {
                let name = document_entry_name(property, document);
                if let Err(e) = archive.add_file(&name, &bytes) {
                    warn!("Could not write {} into the archive: {}", name, e);
                    skipped.record(
                        property.id,
                        SkipReason::ArchiveEntryFailed {
                            document_id: document.id,
                            error: e.to_string(),
                        },
                    );
                }
            }
            Err(e) => {
                warn!(
                    "Skipping file {} of property {}: {}",
                    document.file_path, property.id, e
                );
                skipped.record(
                    property.id,
                    SkipReason::FileUnavailable {
                        document_id: document.id,
                        path: document.file_path.clone(),
                        error: e.to_string(),
                    },
                );
            }
        }
    }

    fn check_size(&self, size: usize) -> CatalogResult<()> {
        let minimum = self.config.min_artifact_bytes;
        if size < minimum {
            return Err(CatalogError::SuspiciousOutputSize { size, minimum });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{detail, new_property, Seeded};
    use crate::catalog::memory::FailPoint;
    use crate::export::spreadsheet::{property_row, Cell, HEADERS};
    use crate::models::{DealType, FileType, NewDocument, PropertyType};
    use std::io::{Cursor, Read};

    fn pipeline(seeded: &Seeded, config: ExportConfig) -> ExportPipeline {
        ExportPipeline::new(
            Arc::new(seeded.store.clone()),
            seeded.blobs.clone(),
            config,
        )
    }

    fn by_ids(ids: Vec<PropertyId>, language: Language) -> ExportRequest {
        ExportRequest {
            selection: ExportSelection::Ids(ids),
            language,
            format: ExportFormat::Archive,
        }
    }

    fn open(bytes: &[u8]) -> zip::ZipArchive<Cursor<Vec<u8>>> {
        zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap()
    }

    fn names(bytes: &[u8]) -> Vec<String> {
        open(bytes).file_names().map(str::to_string).collect()
    }

    fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
        let mut archive = open(bytes);
        let mut out = Vec::new();
        archive.by_name(name).unwrap().read_to_end(&mut out).unwrap();
        out
    }

    /// Concatenated XML parts of an xlsx, enough to look for cell text
    fn workbook_text(xlsx: &[u8]) -> String {
        let mut archive = open(xlsx);
        let mut text = String::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            if entry.name().ends_with(".xml") {
                entry.read_to_string(&mut text).unwrap();
            }
        }
        text
    }

    #[tokio::test]
    async fn empty_id_set_fails_without_bytes() {
        let seeded = Seeded::new().await;
        let err = pipeline(&seeded, ExportConfig::default())
            .export(&by_ids(vec![], Language::En))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NoPropertiesFound));
    }

    #[tokio::test]
    async fn filter_matching_nothing_fails() {
        let seeded = Seeded::new().await;
        seeded
            .create(new_property(PropertyType::House, DealType::Sale, vec![]))
            .await;

        let request = ExportRequest {
            selection: ExportSelection::Filter(PropertyFilter {
                property_type: Some(PropertyType::Office),
                ..Default::default()
            }),
            language: Language::En,
            format: ExportFormat::Spreadsheet,
        };
        let err = pipeline(&seeded, ExportConfig::default())
            .export(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NoPropertiesFound));
    }

    #[tokio::test]
    async fn spreadsheet_export_by_filter() {
        let seeded = Seeded::new().await;
        let house = seeded
            .create(new_property(
                PropertyType::House,
                DealType::Sale,
                vec![detail(Language::Sr, "Beograd", 120_000.0, 4, 110.0)],
            ))
            .await;

        let request = ExportRequest {
            selection: ExportSelection::Filter(PropertyFilter::default()),
            language: Language::Sr,
            format: ExportFormat::Spreadsheet,
        };
        let artifact = pipeline(&seeded, ExportConfig::default())
            .export(&request)
            .await
            .unwrap();

        assert!(artifact.bytes.starts_with(b"PK"));
        assert!(artifact.file_name.starts_with("properties_export_"));
        assert!(artifact.file_name.ends_with(".xlsx"));
        assert_eq!(artifact.content_type, XLSX_CONTENT_TYPE);
        assert!(artifact.skipped.is_empty());
        assert!(workbook_text(&artifact.bytes).contains(&house.property_code));
    }

    #[tokio::test]
    async fn missing_translation_only_leaves_the_spreadsheet() {
        let seeded = Seeded::new().await;
        let english_only = seeded
            .create(new_property(
                PropertyType::House,
                DealType::Sale,
                vec![detail(Language::En, "Belgrade", 100_000.0, 3, 90.0)],
            ))
            .await;
        let bilingual = seeded
            .create(new_property(
                PropertyType::House,
                DealType::Sale,
                vec![
                    detail(Language::En, "Belgrade", 110_000.0, 3, 95.0),
                    detail(Language::Ru, "Белград", 110_000.0, 3, 95.0),
                ],
            ))
            .await;
        let photo = seeded.document(english_only.id, FileType::Image, true).await;

        let artifact = pipeline(&seeded, ExportConfig::default())
            .export(&by_ids(vec![english_only.id, bilingual.id], Language::Ru))
            .await
            .unwrap();

        let skipped: Vec<_> = artifact.skipped.for_property(english_only.id).collect();
        assert_eq!(skipped, vec![&SkipReason::MissingDetail(Language::Ru)]);
        assert_eq!(artifact.skipped.for_property(bilingual.id).count(), 0);

        let sheet = workbook_text(&read_entry(&artifact.bytes, "properties_export.xlsx"));
        assert!(sheet.contains(&bilingual.property_code));
        assert!(!sheet.contains(&english_only.property_code));

        let entries = names(&artifact.bytes);
        assert!(entries.contains(&history_entry_name(&english_only)));
        assert!(entries.contains(&history_entry_name(&bilingual)));
        let photo_entry = format!(
            "files/{}/image_public_{}",
            english_only.archive_dir(),
            photo.file_path.rsplit('/').next().unwrap()
        );
        assert!(entries.contains(&photo_entry));
    }

    #[tokio::test]
    async fn missing_file_is_skipped_not_fatal() {
        let seeded = Seeded::new().await;
        let first = seeded
            .create(new_property(
                PropertyType::Apartment,
                DealType::Rent,
                vec![detail(Language::En, "Belgrade", 900.0, 2, 50.0)],
            ))
            .await;
        let second = seeded
            .create(new_property(
                PropertyType::Office,
                DealType::Rent,
                vec![detail(Language::En, "Novi Sad", 1_500.0, 5, 140.0)],
            ))
            .await;

        let kept = seeded.document(first.id, FileType::Image, true).await;
        let private = seeded.document(first.id, FileType::Document, false).await;
        let lost = seeded.document(second.id, FileType::Video, true).await;
        std::fs::remove_file(seeded.blobs.resolve_absolute_path(&lost.file_path).unwrap())
            .unwrap();

        let artifact = pipeline(&seeded, ExportConfig::default())
            .export(&by_ids(vec![first.id, second.id], Language::En))
            .await
            .unwrap();

        let entries = names(&artifact.bytes);
        assert!(entries.contains(&"properties_export.xlsx".to_string()));
        assert!(entries.contains(&document_entry_name(&first, &kept)));
        assert!(entries.contains(&document_entry_name(&first, &private)));
        assert!(!entries.contains(&document_entry_name(&second, &lost)));
        assert!(entries.contains(&history_entry_name(&first)));
        assert!(entries.contains(&history_entry_name(&second)));

        assert_eq!(
            read_entry(&artifact.bytes, &document_entry_name(&first, &kept)),
            format!("image of property {}", first.id).into_bytes()
        );
        let history = String::from_utf8(read_entry(&artifact.bytes, &history_entry_name(&second)))
            .unwrap();
        assert!(history.contains("Action: create"));

        assert_eq!(artifact.skipped.len(), 1);
        assert!(matches!(
            &artifact.skipped.items()[0],
            SkippedItem { property_id, reason: SkipReason::FileUnavailable { document_id, .. } }
                if *property_id == second.id && *document_id == lost.id
        ));
    }

    #[tokio::test]
    async fn filtered_archive_includes_private_files() {
        let seeded = Seeded::new().await;
        let house = seeded
            .create(new_property(
                PropertyType::House,
                DealType::Sale,
                vec![detail(Language::En, "Belgrade", 100_000.0, 3, 90.0)],
            ))
            .await;
        let private = seeded.document(house.id, FileType::Document, false).await;

        let request = ExportRequest {
            selection: ExportSelection::Filter(PropertyFilter::default()),
            language: Language::En,
            format: ExportFormat::Archive,
        };
        let artifact = pipeline(&seeded, ExportConfig::default())
            .export(&request)
            .await
            .unwrap();

        assert_eq!(artifact.content_type, ZIP_CONTENT_TYPE);
        assert!(names(&artifact.bytes).contains(&document_entry_name(&house, &private)));
    }

    fn column(name: &str) -> usize {
        HEADERS.iter().position(|h| *h == name).unwrap()
    }

    #[tokio::test]
    async fn filter_export_rows_carry_owner_and_every_document() {
        let seeded = Seeded::new().await;
        let house = seeded
            .create(new_property(
                PropertyType::House,
                DealType::Sale,
                vec![detail(Language::En, "Belgrade", 100_000.0, 3, 90.0)],
            ))
            .await;
        seeded.document(house.id, FileType::Image, true).await;
        seeded.document(house.id, FileType::Document, false).await;

        let pipeline = pipeline(&seeded, ExportConfig::default());
        let by_filter = pipeline
            .resolve(&ExportSelection::Filter(PropertyFilter::default()), Language::En)
            .await
            .unwrap();
        let by_ids = pipeline
            .resolve(&ExportSelection::Ids(vec![house.id]), Language::En)
            .await
            .unwrap();
        assert_eq!(by_filter, by_ids);

        let row = property_row(&by_filter[0], Language::En).unwrap();
        assert_eq!(row[column("Contract Number")], Cell::Text("C-100".to_string()));
        assert_eq!(row[column("Contract Status")], Cell::Text("signed".to_string()));
        assert_eq!(row[column("Documents")], Cell::Number(2.0));
    }

    #[tokio::test]
    async fn unwritable_archive_entry_is_skipped() {
        let seeded = Seeded::new().await;
        let house = seeded
            .create(new_property(
                PropertyType::House,
                DealType::Sale,
                vec![detail(Language::En, "Belgrade", 100_000.0, 3, 90.0)],
            ))
            .await;
        let photo = seeded.document(house.id, FileType::Image, true).await;
        // Same file registered twice maps to the same entry name
        let copy = seeded
            .store
            .create_document(NewDocument {
                property_id: house.id,
                file_type: photo.file_type,
                file_path: photo.file_path.clone(),
                is_public: photo.is_public,
            })
            .await
            .unwrap();

        let artifact = pipeline(&seeded, ExportConfig::default())
            .export(&by_ids(vec![house.id], Language::En))
            .await
            .unwrap();

        let entries = names(&artifact.bytes);
        assert!(entries.contains(&document_entry_name(&house, &photo)));
        assert!(entries.contains(&history_entry_name(&house)));
        assert_eq!(artifact.skipped.len(), 1);
        assert!(matches!(
            artifact.skipped.for_property(house.id).next(),
            Some(SkipReason::ArchiveEntryFailed { document_id, .. }) if *document_id == copy.id
        ));
    }

    #[tokio::test]
    async fn history_failure_is_recorded_per_property() {
        let seeded = Seeded::new().await;
        let house = seeded
            .create(new_property(
                PropertyType::House,
                DealType::Sale,
                vec![detail(Language::En, "Belgrade", 100_000.0, 3, 90.0)],
            ))
            .await;
        let photo = seeded.document(house.id, FileType::Image, true).await;
        seeded.store.fail_on(FailPoint::FindHistory);

        let artifact = pipeline(&seeded, ExportConfig::default())
            .export(&by_ids(vec![house.id], Language::En))
            .await
            .unwrap();

        let entries = names(&artifact.bytes);
        assert!(entries.contains(&document_entry_name(&house, &photo)));
        assert!(!entries.contains(&history_entry_name(&house)));
        assert!(matches!(
            artifact.skipped.for_property(house.id).next(),
            Some(SkipReason::HistoryLookupFailed(_))
        ));
    }

    #[tokio::test]
    async fn tiny_output_is_suspicious() {
        let seeded = Seeded::new().await;
        let house = seeded
            .create(new_property(PropertyType::House, DealType::Sale, vec![]))
            .await;

        let config = ExportConfig {
            min_artifact_bytes: 50 * 1024 * 1024,
            ..Default::default()
        };
        let err = pipeline(&seeded, config)
            .export(&by_ids(vec![house.id], Language::Sr))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::SuspiciousOutputSize { .. }));
    }
}
