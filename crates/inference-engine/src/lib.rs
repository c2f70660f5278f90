//! Price Inference Engine
//!
//! Applies the fitted scaler, projects onto the regressor's columns and
//! maps the log-space output back to a nightly price.

mod context;
#[cfg(feature = "onnx")]
mod onnx;
mod pipeline;
mod regressor;
mod scaler;

pub use context::PredictionContext;
#[cfg(feature = "onnx")]
pub use onnx::OnnxRegressor;
pub use pipeline::{PredictionPipeline, PricePrediction};
pub use regressor::{
    Aggregation, LinearParams, LinearRegressor, Regressor, TreeEnsembleParams,
    TreeEnsembleRegressor, TreeNode, TreeParams,
};
pub use scaler::{FittedScaler, Scaler, ScalerParams};

use feature_engine::SchemaError;
use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("{artifact} expects {expected} columns but got {actual}")]
    ShapeMismatch {
        artifact: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Feature vector violates the schema: {0}")]
    SchemaViolation(#[from] SchemaError),
    #[error("Regressor output {0} does not map to a finite price")]
    NonFinitePrediction(f64),
}
