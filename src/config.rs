use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::Language;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub upload_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CatalogConfig {
    pub default_language: Language,
    /// Fresh code pairs to try when generated codes collide
    pub code_attempts: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_language: Language::Sr,
            code_attempts: crate::catalog::properties::DEFAULT_CODE_ATTEMPTS,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Artifacts smaller than this are treated as broken output
    pub min_artifact_bytes: usize,
    pub column_width: f64,
    /// Name of the spreadsheet at the root of an export archive
    pub spreadsheet_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            min_artifact_bytes: 1024,
            column_width: 15.0,
            spreadsheet_name: "properties_export.xlsx".to_string(),
        }
    }
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[storage]
upload_dir = "uploads"

[catalog]
default_language = "sr"
code_attempts = 5

[export]
min_artifact_bytes = 1024
column_width = 15.0
spreadsheet_name = "properties_export.xlsx"
"#;

/// Load configuration from a config.toml file
///
/// Search order:
/// 1. `$CATALOG_CONFIG`, when set
/// 2. Next to the executable
/// 3. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    if let Ok(explicit) = std::env::var("CATALOG_CONFIG") {
        return load_config_from(Path::new(&explicit));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");
            if config_path.exists() {
                return load_config_from(&config_path);
            }
            tracing::debug!("config.toml not found at: {}", config_path.display());
        }
    }

    tracing::info!("Using default embedded configuration");
    parse_config(DEFAULT_CONFIG)
}

pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    tracing::info!("Loading config from: {}", path.display());
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("Invalid config in {}", path.display()))
}

fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(contents)?;
    Ok(config)
}

/// Upload directory from configuration; relative paths resolve against the
/// current directory
pub fn upload_dir(config: &Config) -> PathBuf {
    let dir = Path::new(&config.storage.upload_dir);
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(dir))
            .unwrap_or_else(|_| dir.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.storage.upload_dir, "uploads");
        assert_eq!(config.catalog.default_language, Language::Sr);
        assert_eq!(config.export, ExportConfig::default());
    }

    #[test]
    fn test_optional_sections_fall_back_to_defaults() {
        let config = parse_config(
            r#"
            [storage]
            upload_dir = "/srv/uploads"

            [export]
            min_artifact_bytes = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.export.min_artifact_bytes, 10);
        assert_eq!(config.export.column_width, 15.0);
        assert_eq!(config.catalog.code_attempts, 5);
        assert_eq!(upload_dir(&config), PathBuf::from("/srv/uploads"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[storage]\nupload_dir = \"files\"\n[catalog]\ndefault_language = \"en\"\n",
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.catalog.default_language, Language::En);
        assert!(load_config_from(&dir.path().join("missing.toml")).is_err());
    }
}
