//! Error types for Presage Prep

use thiserror::Error;

/// Errors that can occur during preprocessing
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("Failed to parse timestamp '{0}': expected an ISO-8601-like datetime")]
    TimestampParse(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unsupported pipeline artifact: expected {expected}, got {actual}")]
    UnsupportedArtifact { expected: String, actual: String },

    #[error("Pipeline artifact lists {actual} features, expected {expected}")]
    FeatureCountMismatch { expected: usize, actual: usize },
}
