//! Model Holder
//!
//! Owns the one model instance served for the lifetime of the process. The
//! holder is built once at startup and never mutated afterwards; a failed
//! load leaves it empty and only a restart can recover.

use crate::model::TabularModel;
use crate::onnx::{default_metadata_path, OnnxModel};
use crate::InferenceError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Model source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX artifact
    #[serde(default = "default_model_path")]
    pub path: PathBuf,

    /// Path to the JSON metadata sidecar (defaults to `path` with a `.json` extension)
    #[serde(default)]
    pub metadata_path: Option<PathBuf>,

    /// Exit at startup when the model cannot be loaded
    #[serde(default)]
    pub require_loaded: bool,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("random_forest_model.onnx")
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            metadata_path: None,
            require_loaded: false,
        }
    }
}

impl ModelConfig {
    /// Effective metadata sidecar path
    pub fn metadata_path(&self) -> PathBuf {
        self.metadata_path
            .clone()
            .unwrap_or_else(|| default_metadata_path(&self.path))
    }
}

/// Lifecycle of the held model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// No load attempted
    Unloaded,
    /// Load in progress
    Loading,
    /// Model available for inference
    Ready,
    /// Load attempted and failed
    Failed,
}

/// Holder for the process-wide model
pub struct ModelHolder {
    /// Loaded model, if any
    model: Option<Arc<dyn TabularModel>>,
    /// Load outcome
    state: ModelState,
    /// Artifact location
    path: PathBuf,
}

impl ModelHolder {
    /// Holder with no model and no load attempt
    pub fn unloaded() -> Self {
        Self {
            model: None,
            state: ModelState::Unloaded,
            path: PathBuf::new(),
        }
    }

    /// Holder around an already constructed model
    pub fn with_model(model: Arc<dyn TabularModel>) -> Self {
        info!("Using in-memory model: {}", model.model_type());
        Self {
            model: Some(model),
            state: ModelState::Ready,
            path: PathBuf::new(),
        }
    }

    /// Load the ONNX artifact described by `config`. Never fails; check
    /// [`ModelHolder::is_ready`] afterwards.
    pub fn load(config: &ModelConfig) -> Self {
        let metadata_path = config.metadata_path();
        Self::load_with(&config.path, |path| {
            let model = OnnxModel::load_with_metadata(path, &metadata_path)?;
            Ok(Arc::new(model) as Arc<dyn TabularModel>)
        })
    }

    /// Load through an arbitrary loader after the existence and size checks
    pub fn load_with<F>(path: impl AsRef<Path>, loader: F) -> Self
    where
        F: FnOnce(&Path) -> Result<Arc<dyn TabularModel>, InferenceError>,
    {
        let path = path.as_ref();
        let mut holder = Self {
            model: None,
            state: ModelState::Unloaded,
            path: path.to_path_buf(),
        };
        holder.transition(ModelState::Loading);

        match check_artifact(path).and_then(|()| loader(path)) {
            Ok(model) => {
                info!("Model loaded successfully: {}", model.model_type());
                if model.probabilities().is_some() {
                    info!("Model supports probability estimates");
                } else {
                    info!("Model does not support probability estimates");
                }
                match model.n_features() {
                    Some(n) => info!("Model expects {} features", n),
                    None => warn!("Model does not declare its feature count; inputs are not width-checked"),
                }
                holder.model = Some(model);
                holder.transition(ModelState::Ready);
            }
            Err(e) => {
                error!("Error loading model: {}", e);
                error!("Exception type: {}", error_kind(&e));
                holder.transition(ModelState::Failed);
            }
        }

        holder
    }

    fn transition(&mut self, next: ModelState) {
        debug!("Model state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Whether a usable model is held
    pub fn is_ready(&self) -> bool {
        self.state == ModelState::Ready && self.model.is_some()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ModelState {
        self.state
    }

    /// The held model
    pub fn model(&self) -> Option<&Arc<dyn TabularModel>> {
        self.model.as_ref()
    }

    /// Artifact path the holder loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Existence and size checks run before deserialization
fn check_artifact(path: &Path) -> Result<(), InferenceError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => {
            let cwd = env::current_dir().unwrap_or_default();
            error!("Model file not found at: {}", cwd.join(path).display());
            error!("Current working directory: {}", cwd.display());
            error!("Files in current directory: {:?}", list_dir(&cwd));
            return Err(InferenceError::ModelLoadError(format!(
                "model file not found: {}",
                path.display()
            )));
        }
    };

    let size = metadata.len();
    info!("Model file size: {} bytes", size);
    if size == 0 {
        error!("Model file is empty");
        return Err(InferenceError::ModelLoadError("model file is empty".to_string()));
    }

    Ok(())
}

fn list_dir(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

fn error_kind(err: &InferenceError) -> &'static str {
    match err {
        InferenceError::ModelLoadError(_) => "ModelLoadError",
        InferenceError::ModelNotLoaded => "ModelNotLoaded",
        InferenceError::Validation(_) => "Validation",
        InferenceError::InferenceFailed(_) => "InferenceFailed",
        InferenceError::InvalidInputShape { .. } => "InvalidInputShape",
    }
}
