//! Router fixtures for handler tests

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use data_validator::FeatureMatrix;
use inference_engine::{InferenceEngine, InferenceError, Label, ModelHolder, ProbabilityEstimator, TabularModel};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::{create_router, AppState, ServeConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    None,
    Predict,
    Probabilities,
    Panic,
}

/// Three-feature model: class 1 when the first column is positive
pub struct FixtureModel {
    mode: FailureMode,
    regression: bool,
    classes: Vec<Label>,
    feature_names: Vec<String>,
    calls: AtomicUsize,
}

impl FixtureModel {
    pub fn new(mode: FailureMode) -> Self {
        Self {
            mode,
            regression: false,
            classes: vec![Label::Int(0), Label::Int(1)],
            feature_names: ["credit_score", "loan_amnt", "person_age"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Echoes the first column back as the prediction
    pub fn regressor() -> Self {
        Self {
            regression: true,
            ..Self::new(FailureMode::None)
        }
    }

    pub fn predict_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TabularModel for FixtureModel {
    fn model_type(&self) -> &str {
        if self.regression {
            "RandomForestRegressor"
        } else {
            "RandomForestClassifier"
        }
    }

    fn n_features(&self) -> Option<usize> {
        Some(3)
    }

    fn classes(&self) -> Option<&[Label]> {
        (!self.regression).then_some(self.classes.as_slice())
    }

    fn feature_names(&self) -> Option<&[String]> {
        Some(&self.feature_names)
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            FailureMode::Predict => {
                return Err(InferenceError::InferenceFailed("tree traversal failed".to_string()))
            }
            FailureMode::Panic => panic!("model crashed"),
            _ => {}
        }

        Ok(features
            .values()
            .rows()
            .into_iter()
            .map(|row| {
                if self.regression {
                    Label::Float(row[0])
                } else {
                    Label::Int(i64::from(row[0] > 0.0))
                }
            })
            .collect())
    }

    fn probabilities(&self) -> Option<&dyn ProbabilityEstimator> {
        (!self.regression).then_some(self as &dyn ProbabilityEstimator)
    }
}

impl ProbabilityEstimator for FixtureModel {
    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<Vec<f64>>, InferenceError> {
        if self.mode == FailureMode::Probabilities {
            return Err(InferenceError::InferenceFailed("no calibration".to_string()));
        }
        Ok(features
            .values()
            .rows()
            .into_iter()
            .map(|row| if row[0] > 0.0 { vec![0.25, 0.75] } else { vec![0.75, 0.25] })
            .collect())
    }
}

pub fn app_with(model: FixtureModel) -> (Router, Arc<FixtureModel>) {
    app_with_config(model, &ServeConfig::default())
}

pub fn app_with_config(model: FixtureModel, config: &ServeConfig) -> (Router, Arc<FixtureModel>) {
    let model = Arc::new(model);
    let holder = ModelHolder::with_model(model.clone());
    let state = Arc::new(AppState::new(InferenceEngine::new(holder)));
    (create_router(state, config), model)
}

pub fn loaded_app() -> Router {
    app_with(FixtureModel::new(FailureMode::None)).0
}

pub fn unloaded_app() -> Router {
    let state = Arc::new(AppState::new(InferenceEngine::new(ModelHolder::unloaded())));
    create_router(state, &ServeConfig::default())
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, payload: Value) -> Request<Body> {
    post_raw(uri, &payload.to_string())
}

pub fn post_raw(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
