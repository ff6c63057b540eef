//! Real-estate listing catalog: localized property queries, document
//! registry, audit history and spreadsheet/zip exports.

pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod models;

pub use error::{CatalogError, CatalogResult};
