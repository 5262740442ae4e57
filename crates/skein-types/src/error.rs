//! Error types for lineage metadata.

use thiserror::Error;

/// Result type alias for metadata validation.
pub type Result<T> = std::result::Result<T, MetadataError>;

/// Reasons a piece of extracted metadata is rejected as malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("step metadata has an empty job name")]
    EmptyJobName,

    #[error("dataset in step '{step}' has an empty name")]
    EmptyDatasetName { step: String },

    #[error("dataset '{dataset}' in step '{step}' has an empty source name")]
    EmptySourceName { step: String, dataset: String },
}
