use std::path::{Path, PathBuf};
use std::{env, fs};

use nb_core::{GOGConfig, TCTransformConfig, UnifiedConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};

/// Environment variable naming a config file when no explicit path is given.
pub const CONFIG_ENV: &str = "NANOBRAIN_CONFIG";

/// Everything a host needs to build kernels, transforms and gardens.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub unified: UnifiedConfig,
    pub transform: TCTransformConfig,
    pub gog: GOGConfig,
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<()> {
        self.unified.validate()?;
        self.transform.validate()?;
        self.gog.validate()?;
        Ok(())
    }

    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self> {
        let config: RuntimeConfig = toml::from_str(content).map_err(|source| RuntimeError::TomlParse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| RuntimeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content, path)?;
        tracing::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Explicit path, else `NANOBRAIN_CONFIG`, else built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match config_path(explicit) {
            Some(path) => Self::load(&path),
            None => {
                tracing::debug!("no configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from))
}
