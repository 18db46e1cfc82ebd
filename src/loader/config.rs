//! Loader configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::default_asset::DEFAULT_ASSET_NAME;

#[derive(Debug, thiserror::Error)]
pub enum Err {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Base directory for relative model paths.
    #[serde(default)]
    pub model_root: Option<PathBuf>,

    /// Logical name of the bundled fallback model.
    #[serde(default = "default_asset_name")]
    pub default_asset: String,

    /// Loads the fallback model from this file instead of the bundle.
    #[serde(default)]
    pub default_asset_override: Option<PathBuf>,

    /// Extensions picked up by directory scans, without the leading dot.
    #[serde(default = "default_scan_extensions")]
    pub scan_extensions: Vec<String>,

    /// Descend into subdirectories when scanning.
    #[serde(default = "default_recursive_scan")]
    pub recursive_scan: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            model_root: None,
            default_asset: default_asset_name(),
            default_asset_override: None,
            scan_extensions: default_scan_extensions(),
            recursive_scan: default_recursive_scan(),
        }
    }
}

fn default_asset_name() -> String {
    DEFAULT_ASSET_NAME.to_string()
}

fn default_scan_extensions() -> Vec<String> {
    vec!["vrm".to_string()]
}

fn default_recursive_scan() -> bool {
    true
}

impl LoaderConfig {
    pub fn from_json_str(text: &str) -> Result<Self, Err> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Err> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Joins relative paths onto `model_root`.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.model_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Returns true if `path` carries one of the scan extensions.
    pub fn is_scan_candidate(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.scan_extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
    }
}
