//! ONNX Model Adapter
//!
//! Expects the layout produced by `skl2onnx` with ZipMap disabled:
//! input 0 is `[batch, n_features]`, output 0 holds labels (or regression
//! values) and output 1, when present, holds `[batch, n_classes]`
//! probabilities. Metadata ONNX does not carry (class labels, feature names,
//! estimator name) is read from an optional JSON sidecar.

use crate::model::{Label, ModelMetadata, ProbabilityEstimator, Scored, TabularModel};
use crate::InferenceError;
use data_validator::FeatureMatrix;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tract_onnx::prelude::*;

type OnnxPlan = TypedRunnableModel<TypedModel>;

/// ONNX model evaluated with tract
pub struct OnnxModel {
    /// Optimized execution plan
    plan: OnnxPlan,
    /// Element type of input 0
    input_type: DatumType,
    /// Number of graph outputs
    n_outputs: usize,
    /// Feature count from metadata or the input shape
    n_features: Option<usize>,
    /// Sidecar metadata
    metadata: ModelMetadata,
    /// Reported model type
    model_type: String,
}

impl OnnxModel {
    /// Load a model, reading metadata from the default sidecar path if present
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        Self::load_with_metadata(path, &default_metadata_path(path))
    }

    /// Load a model with an explicit metadata sidecar path
    pub fn load_with_metadata(path: &Path, metadata_path: &Path) -> Result<Self, InferenceError> {
        let metadata = read_metadata(metadata_path)?;

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.into_optimized())
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {e:#}", path.display())))?;

        let input = model
            .input_fact(0)
            .map_err(|e| InferenceError::ModelLoadError(format!("missing input: {e:#}")))?
            .clone();
        if input.shape.rank() != 2 {
            return Err(InferenceError::ModelLoadError(format!(
                "expected a 2-D input, found rank {}",
                input.shape.rank()
            )));
        }

        let declared_width = input
            .shape
            .get(1)
            .and_then(|dim| dim.as_i64())
            .and_then(|width| usize::try_from(width).ok());
        let n_features = match (metadata.n_features, declared_width) {
            (Some(from_metadata), Some(from_graph)) if from_metadata != from_graph => {
                warn!(
                    "Metadata declares {} features but the graph input has {}; using the graph",
                    from_metadata, from_graph
                );
                Some(from_graph)
            }
            (from_metadata, from_graph) => from_graph
                .or(from_metadata)
                .or_else(|| metadata.feature_names.as_ref().map(Vec::len)),
        };

        let n_outputs = model
            .output_outlets()
            .map_err(|e| InferenceError::ModelLoadError(format!("{e:#}")))?
            .len();
        if n_outputs == 0 {
            return Err(InferenceError::ModelLoadError("model has no outputs".to_string()));
        }

        let plan = model
            .into_runnable()
            .map_err(|e| InferenceError::ModelLoadError(format!("{e:#}")))?;

        let model_type = metadata
            .model_type
            .clone()
            .unwrap_or_else(|| "OnnxModel".to_string());

        info!(
            "Loaded ONNX model {} ({:?} input, {:?} features, {} outputs)",
            model_type, input.datum_type, n_features, n_outputs
        );

        Ok(Self {
            plan,
            input_type: input.datum_type,
            n_outputs,
            n_features,
            metadata,
            model_type,
        })
    }

    /// Run the graph on a feature matrix
    fn run(&self, features: &FeatureMatrix) -> Result<TVec<TValue>, InferenceError> {
        let shape = [features.nrows(), features.ncols()];
        let input = match self.input_type {
            DatumType::F64 => Tensor::from_shape(&shape, &features.to_row_major()),
            _ => Tensor::from_shape(&shape, &features.to_row_major_f32()),
        }
        .map_err(|e| InferenceError::InvalidInputShape {
            expected: format!("[batch, {:?}]", self.n_features),
            actual: format!("{e:#}"),
        })?;

        debug!("Running ONNX plan on {:?}", shape);
        self.plan.run(tvec!(input.into())).map_err(inference_failed)
    }
}

impl TabularModel for OnnxModel {
    fn model_type(&self) -> &str {
        &self.model_type
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn classes(&self) -> Option<&[Label]> {
        self.metadata.classes.as_deref()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.metadata.feature_names.as_deref()
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>, InferenceError> {
        let outputs = self.run(features)?;
        labels_from_tensor(&outputs[0])
    }

    fn probabilities(&self) -> Option<&dyn ProbabilityEstimator> {
        (self.n_outputs > 1).then_some(self as &dyn ProbabilityEstimator)
    }

    fn predict_scored(&self, features: &FeatureMatrix) -> Result<Scored, InferenceError> {
        let outputs = self.run(features)?;
        Ok(Scored {
            predictions: labels_from_tensor(&outputs[0])?,
            probabilities: (self.n_outputs > 1).then(|| probability_output(&outputs)),
        })
    }
}

impl ProbabilityEstimator for OnnxModel {
    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<Vec<f64>>, InferenceError> {
        probability_output(&self.run(features)?)
    }
}

/// Sidecar path used when none is configured: `model.onnx` -> `model.json`
pub fn default_metadata_path(model_path: &Path) -> PathBuf {
    model_path.with_extension("json")
}

fn read_metadata(path: &Path) -> Result<ModelMetadata, InferenceError> {
    if !path.exists() {
        debug!("No metadata sidecar at {}", path.display());
        return Ok(ModelMetadata::default());
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| InferenceError::ModelLoadError(format!("{}: {e}", path.display())))?;
    let metadata = serde_json::from_str(&raw)
        .map_err(|e| InferenceError::ModelLoadError(format!("invalid metadata {}: {e}", path.display())))?;
    info!("Read model metadata from {}", path.display());
    Ok(metadata)
}

fn inference_failed<E: fmt::Display>(err: E) -> InferenceError {
    InferenceError::InferenceFailed(format!("{err:#}"))
}

fn labels_from_tensor(tensor: &Tensor) -> Result<Vec<Label>, InferenceError> {
    let labels = match tensor.datum_type() {
        DatumType::I64 => tensor.as_slice::<i64>().map_err(inference_failed)?.iter().map(|&v| Label::Int(v)).collect(),
        DatumType::I32 => tensor
            .as_slice::<i32>()
            .map_err(inference_failed)?
            .iter()
            .map(|&v| Label::Int(i64::from(v)))
            .collect(),
        DatumType::F32 => tensor
            .as_slice::<f32>()
            .map_err(inference_failed)?
            .iter()
            .map(|&v| Label::Float(f64::from(v)))
            .collect(),
        DatumType::F64 => tensor.as_slice::<f64>().map_err(inference_failed)?.iter().map(|&v| Label::Float(v)).collect(),
        DatumType::String => tensor
            .as_slice::<String>()
            .map_err(inference_failed)?
            .iter()
            .cloned()
            .map(Label::Text)
            .collect(),
        other => {
            return Err(InferenceError::InferenceFailed(format!(
                "unsupported label type {other:?}"
            )))
        }
    };

    Ok(labels)
}

fn probability_output(outputs: &[TValue]) -> Result<Vec<Vec<f64>>, InferenceError> {
    let tensor = outputs
        .get(1)
        .ok_or_else(|| InferenceError::InferenceFailed("no probability output".to_string()))?;
    probabilities_from_tensor(tensor)
}

fn probabilities_from_tensor(tensor: &Tensor) -> Result<Vec<Vec<f64>>, InferenceError> {
    let shape = tensor.shape();
    if shape.len() != 2 || shape[1] == 0 {
        return Err(InferenceError::InferenceFailed(format!(
            "expected [batch, classes] probabilities, got {shape:?}"
        )));
    }

    let values = tensor.cast_to::<f64>().map_err(inference_failed)?;
    let values = values.as_slice::<f64>().map_err(inference_failed)?;

    Ok(values.chunks(shape[1]).map(<[f64]>::to_vec).collect())
}
