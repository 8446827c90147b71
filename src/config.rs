//! Runtime configuration, loaded from an optional JSON file and overridden by CLI flags.

use crate::charts::{OutlineError, StateOutlines};
use crate::data::FarsReader;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FarsConfig {
    /// Directory holding the `accident_<year>.csv.bz2` files.
    pub data_dir: PathBuf,
    /// GeoJSON file with state boundary outlines.
    pub boundaries: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub log_level: String,
}

impl Default for FarsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            boundaries: None,
            width: 800,
            height: 600,
            log_level: "info".to_string(),
        }
    }
}

impl FarsConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn reader(&self) -> FarsReader {
        FarsReader::new(&self.data_dir)
    }

    /// Boundary outlines, if a boundary file is configured.
    pub fn load_outlines(&self) -> Result<Option<StateOutlines>, OutlineError> {
        self.boundaries
            .as_ref()
            .map(|path| StateOutlines::from_file(path))
            .transpose()
    }
}
