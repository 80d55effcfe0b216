//! Inference Engine Implementation

use crate::holder::ModelHolder;
use crate::model::{Label, Scored};
use crate::InferenceError;
use data_validator::{FeatureMatrix, Validator};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Result of inference operation
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// One prediction per input row
    pub predictions: Vec<Label>,
    /// Per-row class probabilities, when the model provided them
    pub probabilities: Option<Vec<Vec<f64>>>,
    /// Inference latency in milliseconds
    pub latency_ms: u64,
}

/// Static model metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_features: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<Label>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

/// Runs validated feature matrices through the held model
pub struct InferenceEngine {
    /// Model holder
    holder: ModelHolder,
    /// Checks inputs against the model's declared features
    validator: Validator,
}

impl InferenceEngine {
    /// Create an engine around a holder
    pub fn new(holder: ModelHolder) -> Self {
        let validator = match holder.model() {
            Some(model) => Validator::new(
                model.n_features(),
                model.feature_names().map(<[String]>::to_vec),
            ),
            None => Validator::default(),
        };
        info!(
            "Creating inference engine (model state: {:?})",
            holder.state()
        );
        Self { holder, validator }
    }

    /// Check if a model is loaded
    pub fn is_loaded(&self) -> bool {
        self.holder.is_ready()
    }

    /// Underlying holder
    pub fn holder(&self) -> &ModelHolder {
        &self.holder
    }

    /// Run inference on a feature matrix.
    ///
    /// Prediction errors are returned to the caller. Probability errors are
    /// logged and the result simply carries no probabilities.
    pub fn predict(&self, features: &FeatureMatrix) -> Result<InferenceResult, InferenceError> {
        let start = Instant::now();
        let model = self.holder.model().ok_or(InferenceError::ModelNotLoaded)?;

        self.validator.validate(features)?;

        let Scored {
            predictions,
            probabilities,
        } = model.predict_scored(features)?;
        if predictions.len() != features.nrows() {
            return Err(InferenceError::InferenceFailed(format!(
                "model returned {} predictions for {} rows",
                predictions.len(),
                features.nrows()
            )));
        }

        let probabilities = probabilities.and_then(|proba| {
            proba
                .map_err(|e| debug!("Probabilities unavailable: {}", e))
                .ok()
        });

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(
            "Inference on {} rows completed in {}ms",
            features.nrows(),
            latency_ms
        );

        Ok(InferenceResult {
            predictions,
            probabilities,
            latency_ms,
        })
    }

    /// Report static model metadata without touching the data path
    pub fn info(&self) -> Result<ModelInfo, InferenceError> {
        let model = self.holder.model().ok_or(InferenceError::ModelNotLoaded)?;

        Ok(ModelInfo {
            model_type: model.model_type().to_string(),
            n_features: model.n_features(),
            classes: model.classes().map(<[Label]>::to_vec),
            feature_names: model.feature_names().map(<[String]>::to_vec),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProbabilityEstimator, TabularModel};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Predicts class 1 when the first feature is positive
    struct ThresholdModel {
        classes: Vec<Label>,
        with_proba: bool,
        proba_fails: bool,
        calls: AtomicUsize,
    }

    impl ThresholdModel {
        fn new(with_proba: bool, proba_fails: bool) -> Self {
            Self {
                classes: vec![Label::Int(0), Label::Int(1)],
                with_proba,
                proba_fails,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TabularModel for ThresholdModel {
        fn model_type(&self) -> &str {
            "ThresholdModel"
        }

        fn n_features(&self) -> Option<usize> {
            Some(3)
        }

        fn classes(&self) -> Option<&[Label]> {
            Some(&self.classes)
        }

        fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(features
                .values()
                .rows()
                .into_iter()
                .map(|row| Label::Int(i64::from(row[0] > 0.0)))
                .collect())
        }

        fn probabilities(&self) -> Option<&dyn ProbabilityEstimator> {
            self.with_proba.then_some(self as &dyn ProbabilityEstimator)
        }
    }

    impl ProbabilityEstimator for ThresholdModel {
        fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<Vec<f64>>, InferenceError> {
            if self.proba_fails {
                return Err(InferenceError::InferenceFailed("estimator exploded".to_string()));
            }
            Ok((0..features.nrows()).map(|_| vec![0.4, 0.6]).collect())
        }
    }

    struct FailingModel;

    impl TabularModel for FailingModel {
        fn model_type(&self) -> &str {
            "FailingModel"
        }

        fn predict(&self, _: &FeatureMatrix) -> Result<Vec<Label>, InferenceError> {
            Err(InferenceError::InferenceFailed("could not convert string to float".to_string()))
        }
    }

    /// Scores in one pass; the separate capability methods must not be used
    struct SinglePassModel {
        evaluations: AtomicUsize,
    }

    impl TabularModel for SinglePassModel {
        fn model_type(&self) -> &str {
            "SinglePassModel"
        }

        fn predict(&self, _: &FeatureMatrix) -> Result<Vec<Label>, InferenceError> {
            unreachable!("scored path expected")
        }

        fn probabilities(&self) -> Option<&dyn ProbabilityEstimator> {
            Some(self)
        }

        fn predict_scored(&self, features: &FeatureMatrix) -> Result<Scored, InferenceError> {
            self.evaluations.fetch_add(1, Ordering::SeqCst);
            Ok(Scored {
                predictions: vec![Label::Int(1); features.nrows()],
                probabilities: Some(Ok(vec![vec![0.1, 0.9]; features.nrows()])),
            })
        }
    }

    impl ProbabilityEstimator for SinglePassModel {
        fn predict_proba(&self, _: &FeatureMatrix) -> Result<Vec<Vec<f64>>, InferenceError> {
            unreachable!("scored path expected")
        }
    }

    fn engine(model: impl TabularModel + 'static) -> InferenceEngine {
        InferenceEngine::new(ModelHolder::with_model(Arc::new(model)))
    }

    #[test]
    fn test_batch_predictions_in_order() {
        let engine = engine(ThresholdModel::new(true, false));
        let features =
            FeatureMatrix::from_rows(vec![vec![1.0, 0.0, 0.0], vec![-1.0, 0.0, 0.0], vec![2.0, 0.0, 0.0]])
                .unwrap();

        let result = engine.predict(&features).unwrap();
        assert_eq!(result.predictions, vec![Label::Int(1), Label::Int(0), Label::Int(1)]);
        assert_eq!(result.probabilities.unwrap().len(), 3);
    }

    #[test]
    fn test_count_mismatch_skips_model() {
        let model = Arc::new(ThresholdModel::new(false, false));
        let engine = InferenceEngine::new(ModelHolder::with_model(model.clone()));
        let features = FeatureMatrix::single_row(vec![1.0, 2.0]).unwrap();

        let err = engine.predict(&features).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Expected 3 features, got 2");
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_probability_failure_is_swallowed() {
        let engine = engine(ThresholdModel::new(true, true));
        let features = FeatureMatrix::single_row(vec![1.0, 2.0, 3.0]).unwrap();

        let result = engine.predict(&features).unwrap();
        assert_eq!(result.predictions, vec![Label::Int(1)]);
        assert!(result.probabilities.is_none());
    }

    #[test]
    fn test_no_probability_capability() {
        let engine = engine(ThresholdModel::new(false, false));
        let features = FeatureMatrix::single_row(vec![1.0, 2.0, 3.0]).unwrap();
        assert!(engine.predict(&features).unwrap().probabilities.is_none());
    }

    #[test]
    fn test_prediction_failure_is_reported() {
        let engine = engine(FailingModel);
        let features = FeatureMatrix::single_row(vec![1.0]).unwrap();

        let err = engine.predict(&features).unwrap_err();
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "Prediction failed: could not convert string to float");
    }

    #[test]
    fn test_repeated_predictions_identical() {
        let engine = engine(ThresholdModel::new(true, false));
        let features = FeatureMatrix::single_row(vec![0.5, 0.0, 1.0]).unwrap();

        let first = engine.predict(&features).unwrap();
        let second = engine.predict(&features).unwrap();
        assert_eq!(first.predictions, second.predictions);
        assert_eq!(first.probabilities, second.probabilities);
    }

    #[test]
    fn test_model_evaluated_once_per_request() {
        let model = Arc::new(SinglePassModel {
            evaluations: AtomicUsize::new(0),
        });
        let engine = InferenceEngine::new(ModelHolder::with_model(model.clone()));
        let features = FeatureMatrix::from_rows(vec![vec![1.0], vec![2.0]]).unwrap();

        let result = engine.predict(&features).unwrap();
        assert_eq!(result.predictions, vec![Label::Int(1), Label::Int(1)]);
        assert_eq!(result.probabilities, Some(vec![vec![0.1, 0.9], vec![0.1, 0.9]]));
        assert_eq!(model.evaluations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unloaded_engine() {
        let engine = InferenceEngine::new(ModelHolder::unloaded());
        let features = FeatureMatrix::single_row(vec![1.0]).unwrap();

        assert!(!engine.is_loaded());
        assert!(matches!(engine.predict(&features), Err(InferenceError::ModelNotLoaded)));
        assert!(matches!(engine.info(), Err(InferenceError::ModelNotLoaded)));
    }

    #[test]
    fn test_info_reports_metadata() {
        let info = engine(ThresholdModel::new(true, false)).info().unwrap();
        assert_eq!(info.model_type, "ThresholdModel");
        assert_eq!(info.n_features, Some(3));
        assert_eq!(info.classes, Some(vec![Label::Int(0), Label::Int(1)]));
        assert!(info.feature_names.is_none());

        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("feature_names").is_none());
    }
}
