#![deny(unsafe_code)]

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {origin}: {source}")]
    Toml {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported config schema {schema} v{version}")]
    UnsupportedSchema { schema: String, version: u32 },

    #[error("unknown canonical field {name:?} in {section}")]
    UnknownField { section: String, name: String },

    #[error("unknown timepoint stage {name:?} in {section}")]
    UnknownStage { section: String, name: String },

    #[error("invalid patient id {id:?} in {section}")]
    InvalidPatientId { section: String, id: String },

    #[error("invalid config: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
