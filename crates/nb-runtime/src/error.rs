use std::path::PathBuf;

use nb_core::NanoBrainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to render configuration: {0}")]
    TomlRender(#[from] toml::ser::Error),

    #[error(transparent)]
    Engine(#[from] NanoBrainError),

    #[error("seed error: {0}")]
    Seed(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
