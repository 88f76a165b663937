//! Error types for definition loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors during definition loading
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read definition file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read definition directory {path}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse definition TOML in {path}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {kind} '{id}': {reason}")]
    InvalidDefinition {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("duplicate {kind} id '{id}'")]
    Duplicate { kind: &'static str, id: String },
}
