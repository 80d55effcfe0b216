//! Inspect a model artifact: declared features, type, classes and a sample
//! prediction on an all-zero row.

use anyhow::Context;
use api::{init_logging, LoggingConfig};
use clap::Parser;
use data_validator::FeatureMatrix;
use inference_engine::{InferenceEngine, ModelConfig, ModelHolder};
use std::path::PathBuf;

/// Print what a model expects and how it responds to a sample row
#[derive(Debug, Parser)]
#[command(name = "model-info", version, about, long_about = None)]
struct Args {
    /// ONNX model artifact
    #[arg(default_value = "random_forest_model.onnx")]
    model: PathBuf,

    /// Metadata sidecar (defaults to the model path with a .json extension)
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Log level for load diagnostics
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&LoggingConfig {
        level: args.log_level,
        ..Default::default()
    })?;

    let holder = ModelHolder::load(&ModelConfig {
        path: args.model.clone(),
        metadata_path: args.metadata,
        require_loaded: true,
    });
    let engine = InferenceEngine::new(holder);
    let info = engine
        .info()
        .with_context(|| format!("could not load {}", args.model.display()))?;

    if let Some(names) = &info.feature_names {
        println!("Expected feature names:");
        println!("{names:?}");
    }
    if let Some(n) = info.n_features {
        println!("\nNumber of features expected: {n}");
    }

    println!("\nModel type: {}", info.model_type);
    match &info.classes {
        Some(classes) => {
            let labels: Vec<String> = classes.iter().map(ToString::to_string).collect();
            println!("Number of classes: {} ({})", classes.len(), labels.join(", "));
        }
        None => println!("Number of classes: N/A (regression)"),
    }

    let width = info.n_features.unwrap_or(3);
    let sample = FeatureMatrix::single_row(vec![0.0; width])?;
    println!("\nSample prediction with {width} features:");
    match engine.predict(&sample) {
        Ok(result) => {
            println!("Prediction shape: ({},)", result.predictions.len());
            println!("Sample prediction: {:?}", result.predictions);
            if let Some(probabilities) = result.probabilities {
                println!("Sample probabilities: {probabilities:?}");
            }
        }
        Err(e) => println!("Error: {e}"),
    }

    Ok(())
}
