//! Dataset configuration.
//!
//! Describes which dataset to open and how, loaded from YAML:
//!
//! ```yaml
//! path: /data/gopher.nc
//! mode: write|netcdf4
//! action: create
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::FileMode;
use crate::error::NetCdfResult;

/// What to do with the configured path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAction {
    /// Open an existing dataset.
    #[default]
    Open,
    /// Create a new dataset.
    Create,
}

/// Location and mode of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub path: String,
    /// Mode flags; read-only when omitted.
    #[serde(default)]
    pub mode: FileMode,
    #[serde(default)]
    pub action: OpenAction,
}

impl DatasetConfig {
    /// Open `path` read-only.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: FileMode::NOWRITE,
            action: OpenAction::Open,
        }
    }

    pub fn with_mode(mut self, mode: FileMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_action(mut self, action: OpenAction) -> Self {
        self.action = action;
        self
    }

    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> NetCdfResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> NetCdfResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        debug!(path = %path.display(), dataset = %config.path, "Loaded dataset config");
        Ok(config)
    }
}
