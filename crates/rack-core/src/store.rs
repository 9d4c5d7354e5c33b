//! Persistence for the admin-edited configuration.
//!
//! The store is a single JSON document. Saves go to a temp file in the same
//! directory and are renamed over the target, so readers never observe a
//! half-written file. Concurrent writers are last-writer-wins.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::fields::FieldMapping;
use crate::ConfigError;

pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

fn default_sheet_name() -> String {
    DEFAULT_SHEET_NAME.to_string()
}

/// Where the book list lives and how its columns map onto book fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConfig {
    /// Share URL of the spreadsheet. Empty until an admin sets it.
    #[serde(default)]
    pub sheet_url: String,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    #[serde(default)]
    pub mapping: FieldMapping,
}

impl Default for StoredConfig {
    fn default() -> Self {
        Self {
            sheet_url: String::new(),
            sheet_name: default_sheet_name(),
            mapping: FieldMapping::default(),
        }
    }
}

impl StoredConfig {
    /// Both a sheet URL and a sheet name are set.
    #[must_use]
    pub fn has_source(&self) -> bool {
        !self.sheet_url.trim().is_empty() && !self.sheet_name.trim().is_empty()
    }
}

/// Key-value persistence for [`StoredConfig`].
pub trait ConfigStore: Send + Sync {
    /// Returns the persisted config, or the default when nothing has been
    /// saved yet.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the backing store exists but cannot be read
    /// or parsed.
    fn load(&self) -> Result<StoredConfig, ConfigError>;

    /// Persists `config`, replacing whatever was stored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the backing store cannot be written.
    fn save(&self, config: &StoredConfig) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::StoreIo {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<StoredConfig, ConfigError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoredConfig::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_str(&content).map_err(|e| ConfigError::StoreParse {
            path: self.path.display().to_string(),
            source: e,
        })
    }

    fn save(&self, config: &StoredConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(config).map_err(|e| ConfigError::StoreParse {
            path: self.path.display().to_string(),
            source: e,
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("rack.json"));
        let cfg = store.load().expect("default config");
        assert_eq!(cfg, StoredConfig::default());
        assert_eq!(cfg.sheet_name, "Sheet1");
        assert!(!cfg.has_source());
    }

    #[test]
    fn save_then_load_returns_same_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("nested").join("rack.json"));
        let mut cfg = StoredConfig {
            sheet_url: "https://docs.google.com/spreadsheets/d/abc/edit".to_string(),
            ..StoredConfig::default()
        };
        cfg.mapping.identifier = Some("No".to_string());
        cfg.mapping.location = Some("Rack".to_string());

        store.save(&cfg).expect("save");
        assert_eq!(store.load().expect("load"), cfg);
        assert!(!dir.path().join("nested").join("rack.json.tmp").exists());
    }

    #[test]
    fn reads_legacy_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"sheet_url":"https://docs.google.com/spreadsheets/d/xyz/edit","mapping":{"BK_Number":"No","BK_name":"Title","BK_row":"Rack"}}"#,
        )
        .expect("write fixture");

        let cfg = JsonFileStore::new(&path).load().expect("load legacy");
        assert_eq!(cfg.sheet_name, "Sheet1");
        assert_eq!(cfg.mapping.display_name.as_deref(), Some("Title"));
        assert!(cfg.has_source());
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rack.json");
        std::fs::write(&path, "{not json").expect("write fixture");
        let result = JsonFileStore::new(&path).load();
        assert!(
            matches!(result, Err(ConfigError::StoreParse { .. })),
            "expected StoreParse, got: {result:?}"
        );
    }
}
