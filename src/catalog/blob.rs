use async_trait::async_trait;
use chrono::{Datelike, Utc};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::catalog::traits::BlobStorage;
use crate::error::StorageError;
use crate::models::{FileType, PropertyId};

/// Upload directory on the local filesystem
///
/// Files land in `<root>/<type>/<property_id>/<YYYY>/<MM>/<uuid><ext>`.
pub struct FsBlobStorage {
    root: PathBuf,
}

impl FsBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Rejects absolute paths and parent traversal
fn checked_relative(relative_path: &str) -> Result<&Path, StorageError> {
    let path = Path::new(relative_path);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if relative_path.is_empty() || escapes {
        return Err(StorageError::InvalidPath(relative_path.to_string()));
    }
    Ok(path)
}

fn not_found_or_io(err: std::io::Error, relative_path: &str) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(relative_path.to_string())
    } else {
        StorageError::Io(err)
    }
}

#[async_trait]
impl BlobStorage for FsBlobStorage {
    async fn save(
        &self,
        bytes: &[u8],
        file_type: FileType,
        owner: PropertyId,
        original_name: &str,
    ) -> Result<String, StorageError> {
        let now = Utc::now();
        let dir = PathBuf::from(file_type.as_str())
            .join(owner.to_string())
            .join(format!("{}", now.year()))
            .join(format!("{:02}", now.month()));

        tokio::fs::create_dir_all(self.root.join(&dir)).await?;

        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        let relative = dir.join(format!("{}{}", Uuid::new_v4(), extension));

        tokio::fs::write(self.root.join(&relative), bytes).await?;
        debug!("Saved {} bytes to {}", bytes.len(), relative.display());

        // Stored paths always use forward slashes so archives and DB rows agree
        Ok(relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"))
    }

    async fn delete(&self, relative_path: &str) -> Result<(), StorageError> {
        let path = self.resolve_absolute_path(relative_path)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(e, relative_path))
    }

    async fn read(&self, relative_path: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve_absolute_path(relative_path)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| not_found_or_io(e, relative_path))
    }

    fn resolve_absolute_path(&self, relative_path: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(checked_relative(relative_path)?))
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
