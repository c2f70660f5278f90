//! Listing Price API Server
//!
//! REST API in front of the prediction context: category options,
//! neighbourhood bounds and nightly price predictions.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use data_validator::{ValidationError, Validator};
use inference_engine::{InferenceError, PredictionContext};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

mod routes;
pub mod settings;

pub use routes::predictions::{format_usd, PredictionRequest, PredictionResponse};
pub use settings::{LoggingSettings, ServerSettings, Settings};

/// Application state shared across handlers.
///
/// Everything here is read-only once the server starts, so handlers share
/// it through an `Arc` without locking.
pub struct AppState {
    /// Loaded artifacts
    pub context: PredictionContext,
    /// Form limits checked before prediction
    pub validator: Validator,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus exporter, when one is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(context: PredictionContext, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            context,
            validator: Validator::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics,
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Errors returned by handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body: {0}")]
    BadRequest(String),
    #[error("Record rejected with {} errors", .0.len())]
    Validation(Vec<ValidationError>),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Prediction failed: {0}")]
    Inference(#[from] InferenceError),
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, details) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, Vec::new()),
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                errors.iter().map(ToString::to_string).collect(),
            ),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, Vec::new()),
            ApiError::Inference(e) => {
                error!("Prediction failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub scaler_columns: usize,
    pub model_columns: usize,
    pub neighbourhoods: usize,
}

/// Create the application router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/options", get(routes::options::get_options))
        .route("/api/v1/locations", get(routes::locations::get_locations))
        .route(
            "/api/v1/locations/:borough/:neighbourhood",
            get(routes::locations::get_location),
        )
        .route("/api/v1/predictions", post(routes::predictions::create_prediction))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let schema = state.context.schema();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        scaler_columns: schema.scaler_width(),
        model_columns: schema.model_width(),
        neighbourhoods: state.context.geo().neighbourhood_count(),
    })
}

/// Prometheus exposition
async fn metrics_handler(State(state): State<SharedState>) -> Result<String, ApiError> {
    state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .ok_or_else(|| ApiError::NotFound("metrics exporter not installed".to_string()))
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Logging setup errors
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Unknown log level {0:?}; expected trace, debug, info, warn or error")]
    InvalidLevel(String),
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

fn parse_level(level: &str) -> Result<Level, LoggingError> {
    level
        .parse::<Level>()
        .map_err(|_| LoggingError::InvalidLevel(level.to_string()))
}

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<(), LoggingError> {
    let level = parse_level(&settings.level)?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Run the server until Ctrl-C
pub async fn run_server(state: SharedState, addr: &str) -> std::io::Result<()> {
    let app = create_router(state);

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use data_validator::{GeoBounds, GeoIndex};
    use feature_engine::FeatureSchema;
    use inference_engine::{FittedScaler, LinearParams, LinearRegressor, ScalerParams};

    pub const SCALER_COLUMNS: &[&str] = &[
        "latitude",
        "longitude",
        "accommodates",
        "bedrooms",
        "neighbourhood_group_cleansed_Manhattan",
        "neighbourhood_cleansed_Harlem",
        "room_type_Private_room",
        "room_type_Shared_room",
        "property_type_Entire_rental_unit",
        "property_type_Private_room_in_home",
        "host_is_superhost_t",
        "host_response_rate_90",
        "host_response_rate_100",
    ];

    pub const MODEL_COLUMNS: &[&str] = &["accommodates", "room_type_Private_room", "host_is_superhost_t"];

    pub fn state() -> SharedState {
        let to_strings = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let schema = FeatureSchema::new(to_strings(SCALER_COLUMNS), to_strings(MODEL_COLUMNS)).unwrap();

        let n = SCALER_COLUMNS.len();
        let scaler = FittedScaler::from_params(ScalerParams::Standard {
            mean: vec![0.0; n],
            scale: vec![1.0; n],
        })
        .unwrap();
        let model = LinearRegressor::from_params(LinearParams {
            intercept: 4.0,
            coefficients: vec![0.1, -0.5, 0.2],
        })
        .unwrap();

        let mut geo = GeoIndex::default();
        geo.insert("Manhattan", "Harlem", GeoBounds::new(40.7995, 40.8345, -73.9597, -73.9300));
        geo.insert("Manhattan", "Upper West Side", GeoBounds::new(40.77, 40.80, -73.99, -73.96));
        geo.insert("Staten Island", "Tottenville", GeoBounds::new(40.50, 40.50, -74.25, -74.24));

        let context =
            PredictionContext::new(Arc::new(schema), Arc::new(scaler), Arc::new(model), geo).unwrap();
        Arc::new(AppState::new(context, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health() {
        let app = create_router(test_support::state());
        let response = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["scaler_columns"], test_support::SCALER_COLUMNS.len());
        assert_eq!(json["model_columns"], 3);
        assert_eq!(json["neighbourhoods"], 3);
    }

    #[tokio::test]
    async fn test_metrics_without_exporter() {
        let app = create_router(test_support::state());
        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("WARN").unwrap(), Level::WARN);
        assert_eq!(parse_level(&LoggingSettings::default().level).unwrap(), Level::INFO);
    }

    #[test]
    fn test_misspelled_log_level_is_rejected() {
        let settings = LoggingSettings {
            level: "verbose".to_string(),
            json: false,
        };
        match init_logging(&settings) {
            Err(LoggingError::InvalidLevel(level)) => assert_eq!(level, "verbose"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_validation_error_is_unprocessable() {
        let response = ApiError::Validation(vec![ValidationError::OutOfRange {
            field: "accommodates",
            value: 40.0,
            min: 1.0,
            max: 16.0,
        }])
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
