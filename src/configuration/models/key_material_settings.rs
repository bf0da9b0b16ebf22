use crate::configuration::configuration_error::ConfigurationError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Locations of the key material of this cell.
/// Exactly one of `symmetric_key` and `symmetric_key_path` must be set.
#[derive(Debug, Deserialize)]
pub struct KeyMaterialSettings {
    pub symmetric_key: Option<String>,
    pub symmetric_key_path: Option<PathBuf>,
    pub private_key_path: PathBuf,
    pub certificate_path: PathBuf,
    #[serde(default)]
    pub trusted_root_paths: Vec<PathBuf>,
}

impl KeyMaterialSettings {
    pub fn from_yaml(document: &str) -> Result<Self, ConfigurationError> {
        serde_yml::from_str(document).map_err(|e| ConfigurationError::Settings(e.to_string()))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigurationError> {
        let document = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&document)
    }
}
