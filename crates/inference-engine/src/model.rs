//! Model Capability Interface

use crate::InferenceError;
use data_validator::FeatureMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single prediction or class label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    /// Integer class id
    Int(i64),
    /// Regression output or float-coded class
    Float(f64),
    /// Named class
    Text(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(v) => write!(f, "{v}"),
            Label::Float(v) => write!(f, "{v}"),
            Label::Text(v) => f.write_str(v),
        }
    }
}

/// Descriptive metadata not carried by the model graph itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Estimator name, e.g. `RandomForestClassifier`
    pub model_type: Option<String>,
    /// Declared feature count
    pub n_features: Option<usize>,
    /// Class labels, ordered like the probability columns
    pub classes: Option<Vec<Label>>,
    /// Feature names in column order
    pub feature_names: Option<Vec<String>>,
}

/// Output of a single model evaluation
#[derive(Debug)]
pub struct Scored {
    /// One prediction per input row
    pub predictions: Vec<Label>,
    /// Probabilities when the model has the capability. Failures stay inside
    /// so callers can keep the predictions.
    pub probabilities: Option<Result<Vec<Vec<f64>>, InferenceError>>,
}

/// Probability estimation capability
pub trait ProbabilityEstimator: Send + Sync {
    /// Per-row class probabilities, columns aligned with `classes()`
    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<Vec<f64>>, InferenceError>;
}

/// Minimal contract for a servable tabular model.
///
/// Implementations must be safe to call from several request handlers at
/// once; the model is never mutated after loading.
pub trait TabularModel: Send + Sync {
    /// Human-readable model type
    fn model_type(&self) -> &str;

    /// Number of input features, if declared
    fn n_features(&self) -> Option<usize> {
        None
    }

    /// Class labels for classifiers
    fn classes(&self) -> Option<&[Label]> {
        None
    }

    /// Feature names in column order
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// One prediction per input row
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>, InferenceError>;

    /// Probability capability, when the model has one
    fn probabilities(&self) -> Option<&dyn ProbabilityEstimator> {
        None
    }

    /// Predictions and probabilities together. Models that produce both from
    /// one pass should override this.
    fn predict_scored(&self, features: &FeatureMatrix) -> Result<Scored, InferenceError> {
        let predictions = self.predict(features)?;
        let probabilities = self
            .probabilities()
            .map(|estimator| estimator.predict_proba(features));
        Ok(Scored {
            predictions,
            probabilities,
        })
    }
}
