use thiserror::Error;

/// Failures reported by a persistence backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    Missing(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

/// Failures reported by blob storage
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("persistence failure while {context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: StoreError,
    },

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("no properties found for export")]
    NoPropertiesFound,

    #[error("export produced {size} bytes, expected at least {minimum}")]
    SuspiciousOutputSize { size: usize, minimum: usize },

    #[error("spreadsheet generation failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("archive generation failed: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Attaches a description of the failed step to a store error
pub trait StoreContext<T> {
    fn context(self, context: impl Into<String>) -> CatalogResult<T>;

    fn with_context<F: FnOnce() -> String>(self, f: F) -> CatalogResult<T>;
}

impl<T> StoreContext<T> for Result<T, StoreError> {
    fn context(self, context: impl Into<String>) -> CatalogResult<T> {
        self.map_err(|source| CatalogError::Persistence {
            context: context.into(),
            source,
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> CatalogResult<T> {
        self.map_err(|source| CatalogError::Persistence {
            context: f(),
            source,
        })
    }
}
