//! Model Info Route

use axum::{extract::State, Json};
use inference_engine::{InferenceError, ModelInfo};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

/// Response for the model-info endpoint
#[derive(Debug, Serialize)]
pub struct ModelInfoResponse {
    #[serde(flatten)]
    pub info: ModelInfo,
    pub success: bool,
}

/// Get static model metadata
pub async fn model_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModelInfoResponse>, ApiError> {
    let info = state.engine.info().map_err(|e| match e {
        InferenceError::ModelNotLoaded => ApiError::ModelNotLoaded,
        other => ApiError::ModelInfo(other.to_string()),
    })?;

    Ok(Json(ModelInfoResponse {
        info,
        success: true,
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{body_json, get, loaded_app, unloaded_app};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_model_info_reports_metadata() {
        let response = loaded_app().oneshot(get("/model-info")).await.unwrap();
        assert_eq!(response.status(), 200);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["model_type"], "RandomForestClassifier");
        assert_eq!(body["n_features"], 3);
        assert_eq!(body["classes"], serde_json::json!([0, 1]));
        assert_eq!(
            body["feature_names"],
            serde_json::json!(["credit_score", "loan_amnt", "person_age"])
        );
    }

    #[tokio::test]
    async fn test_model_info_without_model() {
        let response = unloaded_app().oneshot(get("/model-info")).await.unwrap();
        assert_eq!(response.status(), 500);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Model not loaded");
    }
}
