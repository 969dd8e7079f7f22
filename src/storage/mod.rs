use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{AlterHtmlOptions, ProbeConfig};
use crate::error::SelfTestError;

/// Source of the persisted plugin configuration.
pub trait ConfigProvider: Send + Sync {
    /// `Ok(None)` when the operator has never saved the options.
    fn load_config(&self) -> Result<Option<ProbeConfig>, SelfTestError>;
}

/// Reads the plugin configuration from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for JsonConfigFile {
    fn load_config(&self) -> Result<Option<ProbeConfig>, SelfTestError> {
        load_json(&self.path)
    }
}

/// Load alter-html options saved next to the plugin configuration.
pub fn load_alter_html_options(path: &Path) -> Result<Option<AlterHtmlOptions>, SelfTestError> {
    load_json(path)
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, SelfTestError> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path).map_err(|source| SelfTestError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| SelfTestError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
}
