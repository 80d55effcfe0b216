//! Validation Error Types

use thiserror::Error;

/// Errors raised while turning a request payload into a feature matrix
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Payload is absent or empty
    #[error("No data provided")]
    NoData,

    /// Payload matches none of the accepted shapes
    #[error("Unsupported input shape: {0}")]
    UnsupportedShape(String),

    /// Payload has the right shape but carries unusable values
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Rows of a batch differ in length
    #[error("Row {row} has {actual} features, expected {expected} like the first row")]
    RaggedRows {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Column count differs from the model's declared feature count
    #[error("Expected {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },
}
