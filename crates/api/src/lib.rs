//! Tabular Model Serving API
//!
//! HTTP surface for a single pre-trained tabular model:
//!
//! - `GET  /health` - liveness and model readiness
//! - `POST /predict` - predictions (and probabilities) for one or more rows
//! - `GET  /model-info` - static model metadata
//! - `GET  /metrics` - Prometheus metrics, when enabled

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use inference_engine::{InferenceEngine, ModelHolder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
pub mod rate_limit;
mod routes;

#[cfg(test)]
mod test_support;

pub use config::{LoggingConfig, MetricsConfig, ServeConfig, ServerConfig};
pub use error::{ApiError, ErrorResponse};

/// Application state shared across handlers
pub struct AppState {
    /// Inference engine around the loaded model
    pub engine: InferenceEngine,
    /// Prometheus handle, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(engine: InferenceEngine) -> Self {
        Self {
            engine,
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, config: &ServeConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/predict", post(routes::predictions::predict))
        .route("/model-info", get(routes::model_info::model_info))
        .route("/metrics", get(routes::metrics::render))
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(TraceLayer::new_for_http());

    if config.server.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    if config.rate_limit.enabled {
        if let Some(governor) = rate_limit::create_governor_config(&config.rate_limit) {
            info!(
                "Rate limiting enabled: burst {} per IP, replenish every {}s",
                config.rate_limit.burst_size, config.rate_limit.per_second
            );
            router = router.layer(GovernorLayer { config: governor });
        }
    }

    router.with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: state.engine.is_loaded(),
    })
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = config.level.parse::<Level>().unwrap_or_else(|_| {
        eprintln!("Unknown log level {:?}, using info", config.level);
        Level::INFO
    });

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(config.with_target);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Install the global Prometheus recorder
pub fn install_metrics_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("Prometheus metrics available at /metrics");
    Ok(handle)
}

/// Load the model and run the server until it stops
pub async fn run_server(config: ServeConfig) -> anyhow::Result<()> {
    info!("Loading model from {}", config.model.path.display());
    let holder = ModelHolder::load(&config.model);

    if !holder.is_ready() {
        if config.model.require_loaded {
            error!("Failed to load model. Exiting.");
            anyhow::bail!("model could not be loaded from {}", config.model.path.display());
        }
        warn!("Serving without a model; /predict and /model-info will return errors");
    }

    let mut state = AppState::new(InferenceEngine::new(holder));
    if config.metrics.enabled {
        state = state.with_metrics(install_metrics_recorder()?);
    }

    let app = create_router(Arc::new(state), &config);
    let addr = config.server.addr();

    info!("Starting API server on {}", addr);
    info!("API endpoints:");
    info!("  GET  /health - Health check");
    info!("  POST /predict - Predict one or more rows");
    info!("  GET  /model-info - Model metadata");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
