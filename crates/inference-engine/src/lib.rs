//! Tabular Inference Engine
//!
//! Holds the single model loaded at startup and runs predictions against it.
//! Models are ONNX graphs evaluated with tract-onnx; anything implementing
//! [`TabularModel`] can be served.

mod engine;
mod holder;
mod model;
mod onnx;

pub use engine::{InferenceEngine, InferenceResult, ModelInfo};
pub use holder::{ModelConfig, ModelHolder, ModelState};
pub use model::{Label, ModelMetadata, ProbabilityEstimator, Scored, TabularModel};
pub use onnx::OnnxModel;

use data_validator::ValidationError;
use thiserror::Error;

/// Errors during model loading and inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Model not loaded")]
    ModelNotLoaded,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Prediction failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
}

impl InferenceError {
    /// Whether the error was caused by the request rather than the model
    pub fn is_client_error(&self) -> bool {
        matches!(self, InferenceError::Validation(_))
    }
}
