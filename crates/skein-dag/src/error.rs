//! Error types for DAG definitions and lineage reporting.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for DAG and lineage operations.
pub type Result<T> = std::result::Result<T, LineageError>;

/// Errors raised while defining DAGs or extracting lineage.
///
/// None of these ever reach the host from the lifecycle hooks; the engine
/// logs and swallows them.
#[derive(Debug, Error)]
pub enum LineageError {
    /// An extractor could not produce metadata.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Extracted metadata was rejected before reaching the server.
    #[error("Malformed metadata: {0}")]
    Metadata(#[from] skein_types::MetadataError),

    /// A lineage server call failed.
    #[error("Lineage client error: {0}")]
    Client(#[from] skein_client::Error),

    /// Invalid DAG definition.
    #[error("Invalid DAG: {0}")]
    InvalidDag(String),

    /// Unrecognized schedule expression.
    #[error("Invalid schedule '{0}'")]
    InvalidSchedule(String),

    /// A DAG file could not be read.
    #[error("Failed to read DAG file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A DAG file is not valid TOML for the expected schema.
    #[error("Failed to parse DAG file: {0}")]
    Parse(#[from] toml::de::Error),
}
