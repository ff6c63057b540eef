use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CatalogError;

pub mod codes;

pub type PropertyId = u64;
pub type DocumentId = u64;
pub type HistoryId = u64;
pub type AgentId = u64;

/// Language of a localized detail row
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Sr,
    En,
    Ru,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Sr, Language::En, Language::Ru];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Sr => "sr",
            Language::En => "en",
            Language::Ru => "ru",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sr" => Ok(Language::Sr),
            "en" => Ok(Language::En),
            "ru" => Ok(Language::Ru),
            other => Err(CatalogError::Validation(format!("invalid language: {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    House,
    Apartment,
    Office,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::House => "house",
            PropertyType::Apartment => "apartment",
            PropertyType::Office => "office",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DealType {
    Sale,
    Rent,
}

impl DealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealType::Sale => "sale",
            DealType::Rent => "rent",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    Ready,
    #[default]
    New,
    Shared,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Ready => "ready",
            PropertyStatus::New => "new",
            PropertyStatus::Shared => "shared",
        }
    }
}

/// Kind of an uploaded file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Video,
    Document,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Video => "video",
            FileType::Document => "document",
        }
    }

    /// Lowercase file extensions accepted for this kind of upload
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            FileType::Image => &[".jpg", ".jpeg", ".png", ".gif"],
            FileType::Video => &[".mp4", ".mov", ".avi"],
            FileType::Document => &[".pdf", ".doc", ".docx", ".txt"],
        }
    }

    pub fn accepts(&self, file_name: &str) -> bool {
        let extension = std::path::Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()));

        match extension {
            Some(ext) => self.allowed_extensions().contains(&ext.as_str()),
            None => false,
        }
    }
}

impl FromStr for FileType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(FileType::Image),
            "video" => Ok(FileType::Video),
            "document" => Ok(FileType::Document),
            other => Err(CatalogError::Validation(format!("invalid file type: {other:?}"))),
        }
    }
}

/// Localized listing attributes for one property in one language
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Detail {
    pub language: Language,

    // Translated fields
    pub city: String,
    pub district: String,
    pub address: String,
    pub heating_type: String,
    #[serde(default)]
    pub plot_facilities: serde_json::Value,
    #[serde(default)]
    pub equipment: serde_json::Value,
    pub road_access: String,
    pub description: String,

    pub floor_number: i32,
    pub total_floors: i32,
    pub living_area: f64,
    pub rooms: i32,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub plot_size: f64,
    pub price: f64,

    pub registered: bool,
    pub water_supply: bool,
    pub sewage: bool,
}

/// Contract metadata of the property owner
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Owner {
    pub properties_count: i32,
    pub contract_status: String,
    pub contract_number: String,
    pub contract_end_date: Option<DateTime<Utc>>,
    pub contract_file_path: Option<String>,
}

/// Metadata for a file stored against a property
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub property_id: PropertyId,
    pub file_type: FileType,
    pub file_path: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// A document that has been saved to storage but not registered yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub property_id: PropertyId,
    pub file_type: FileType,
    pub file_path: String,
    pub is_public: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Create,
    Update,
    StatusUpdate,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Create => "create",
            HistoryAction::Update => "update",
            HistoryAction::StatusUpdate => "status_update",
        }
    }
}

/// Audit record of a lifecycle action on a property
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct History {
    pub id: HistoryId,
    pub property_id: PropertyId,
    pub action_type: HistoryAction,
    pub action_date: DateTime<Utc>,
    pub agent_id: AgentId,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHistory {
    pub property_id: PropertyId,
    pub action_type: HistoryAction,
    pub agent_id: AgentId,
    pub details: serde_json::Value,
}

/// Core property data model, the aggregate root of the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: PropertyId,
    pub agent_code: String,
    pub property_code: String,
    pub property_type: PropertyType,
    pub deal_type: DealType,
    pub status: PropertyStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub details: Vec<Detail>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default)]
    pub history: Vec<History>,
}

impl Property {
    pub fn detail(&self, language: Language) -> Option<&Detail> {
        self.details.iter().find(|d| d.language == language)
    }

    /// Folder name used for this property inside an export archive
    pub fn archive_dir(&self) -> String {
        format!("{}_{}", self.property_code, self.agent_code)
    }
}

/// Input for creating a property; codes and timestamps are generated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewProperty {
    pub property_type: PropertyType,
    pub deal_type: DealType,
    #[serde(default)]
    pub status: PropertyStatus,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub details: Vec<Detail>,
    #[serde(default)]
    pub owner: Option<Owner>,
}

/// Changes applied by an update; codes can never be changed
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PropertyUpdate {
    pub property_type: Option<PropertyType>,
    pub deal_type: Option<DealType>,
    pub status: Option<PropertyStatus>,
    /// Detail rows to upsert, one per language; other languages are kept
    #[serde(default)]
    pub details: Vec<Detail>,
    pub owner: Option<Owner>,
}

fn default_active() -> bool {
    true
}
