//! Prediction Routes

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use inference_engine::Label;
use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::ApiError;
use crate::AppState;

/// Response for the predict endpoint. `predictions` always holds one entry
/// per input row, including single-row requests.
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predictions: Vec<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<Vec<f64>>>,
    pub success: bool,
}

/// Predict for the rows in the request body
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let outcome = match body {
        Ok(body) => run_prediction(state, body).await,
        Err(rejection) => Err(rejection.into()),
    };

    let label = match &outcome {
        Ok(_) => "success",
        Err(e) if e.status_code().is_client_error() => "invalid",
        Err(_) => "error",
    };
    counter!("predict_requests_total", "outcome" => label).increment(1);

    outcome.into_response()
}

async fn run_prediction(state: Arc<AppState>, body: Bytes) -> Result<Json<PredictResponse>, ApiError> {
    if !state.engine.is_loaded() {
        return Err(ApiError::ModelNotLoaded);
    }

    let payload = parse_body(&body)?;
    let features = data_validator::normalize(&payload)?;
    let rows = features.nrows();
    debug!("Predicting {} rows x {} features", rows, features.ncols());

    let worker = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || worker.engine.predict(&features))
        .await
        .map_err(|e| {
            error!("Inference task aborted: {}", e);
            ApiError::Prediction("inference task aborted".to_string())
        })??;

    counter!("predict_rows_total").increment(rows as u64);
    histogram!("inference_latency_ms").record(result.latency_ms as f64);

    Ok(Json(PredictResponse {
        predictions: result.predictions,
        probabilities: result.probabilities,
        success: true,
    }))
}

/// An empty body is treated like an empty payload
fn parse_body(body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {e}")))
}
