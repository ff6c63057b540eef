pub mod blob;
pub mod documents;
pub mod memory;
pub mod properties;
pub mod query;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use blob::FsBlobStorage;
pub use documents::DocumentRegistry;
pub use memory::MemoryStore;
pub use properties::PropertyService;
pub use query::CatalogQueryEngine;
pub use traits::{BlobStorage, CatalogStore, CatalogTransaction};
pub use types::{DocumentScope, PropertyFilter, PropertyQuery};
