//! YAML configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.pkgsync/
//!   config.yaml   (optional: every field has a default)
//! ```
//!
//! # API pattern
//!
//! - `load_at(home)`: explicit home; used in tests with `TempDir`
//! - `load()`: derives home from `dirs::home_dir()`, delegates to `load_at`
//! - `load_from(path)`: explicit file, e.g. `--config`; the file must exist

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Repository;
use crate::url::DEFAULT_REGION_ALIAS;

/// Engine-facing settings derived from [`SyncConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySettings {
    pub storage_domain: String,
    pub manifest_suffix: String,
    pub index_name: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        SyncConfig::default().settings()
    }
}

/// Default source repository used when the CLI omits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDefaults {
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub region: Option<String>,
}

/// On-disk configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub storage_domain: String,
    pub default_region: String,
    pub manifest_suffix: String,
    pub index_name: String,
    /// Root directory of the filesystem object store.
    pub store_root: Option<PathBuf>,
    pub source: Option<SourceDefaults>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            storage_domain: "amazonaws.com".to_owned(),
            default_region: DEFAULT_REGION_ALIAS.to_owned(),
            manifest_suffix: ".json".to_owned(),
            index_name: "index.json".to_owned(),
            store_root: None,
            source: None,
        }
    }
}

impl SyncConfig {
    pub fn settings(&self) -> RepositorySettings {
        RepositorySettings {
            storage_domain: self.storage_domain.clone(),
            manifest_suffix: self.manifest_suffix.clone(),
            index_name: self.index_name.clone(),
        }
    }

    /// The configured default source repository, if any.
    pub fn source_repository(&self) -> Option<Repository> {
        self.source.as_ref().map(|s| {
            Repository::new(
                s.bucket.clone(),
                &s.prefix,
                s.region.clone().unwrap_or_else(|| self.default_region.clone()),
            )
        })
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.manifest_suffix.is_empty() {
            return Err(ConfigError::Invalid("manifest_suffix must not be empty".into()));
        }
        if self.index_name.is_empty() {
            return Err(ConfigError::Invalid("index_name must not be empty".into()));
        }
        if self.index_name.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "index_name '{}' must be a plain object name",
                self.index_name
            )));
        }
        if self.storage_domain.is_empty() {
            return Err(ConfigError::Invalid("storage_domain must not be empty".into()));
        }
        Ok(self)
    }
}

/// `<home>/.pkgsync/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".pkgsync").join("config.yaml")
}

/// Load `<home>/.pkgsync/config.yaml`, falling back to defaults when absent.
pub fn load_at(home: &Path) -> Result<SyncConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(SyncConfig::default());
    }
    load_from(&path)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SyncConfig, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    load_at(&home)
}

/// Load an explicit config file.
pub fn load_from(path: &Path) -> Result<SyncConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: SyncConfig = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let home = TempDir::new().unwrap();
        let config = load_at(home.path()).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.settings().manifest_suffix, ".json");
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let home = TempDir::new().unwrap();
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "index_name: repodata.json\n").unwrap();

        let config = load_at(home.path()).unwrap();
        assert_eq!(config.index_name, "repodata.json");
        assert_eq!(config.storage_domain, "amazonaws.com");
    }

    #[test]
    fn source_region_falls_back_to_default_region() {
        let config = SyncConfig {
            default_region: "s3-us-west-2".into(),
            source: Some(SourceDefaults {
                bucket: "upstream".into(),
                prefix: "stable".into(),
                region: None,
            }),
            ..SyncConfig::default()
        };
        let repo = config.source_repository().unwrap();
        assert_eq!(repo, Repository::new("upstream", "stable/", "s3-us-west-2"));
    }

    #[test]
    fn empty_suffix_is_rejected() {
        let home = TempDir::new().unwrap();
        let path = home.path().join("bad.yaml");
        std::fs::write(&path, "manifest_suffix: \"\"\n").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got: {err}");
    }
}
