use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for directory enumeration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Maximum directory depth scanned below the root (default: 64).
    pub max_depth: usize,
    /// Whether symbolic links are followed while scanning.
    pub follow_links: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            follow_links: false,
        }
    }
}

impl StoreConfig {
    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(source: &str) -> StoreResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let source = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.max_depth == 0 {
            return Err(StoreError::Config(
                "max_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
