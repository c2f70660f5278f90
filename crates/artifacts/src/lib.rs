//! Artifact Loading
//!
//! Reads the trained regressor, fitted scaler, both feature lists and the
//! geo bounds from disk. All five must load before anything is served.

mod loader;
mod paths;

pub use loader::{load_context, ArtifactLoader};
pub use paths::{ArtifactPaths, ModelFormat};

use feature_engine::SchemaError;
use inference_engine::InferenceError;
use std::path::PathBuf;
use thiserror::Error;

/// Artifact errors; all of them are fatal at startup
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Missing artifact {artifact} at {}: {source}", path.display())]
    Missing {
        artifact: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed artifact {artifact} at {}: {reason}", path.display())]
    Malformed {
        artifact: &'static str,
        path: PathBuf,
        reason: String,
    },
    #[error("Inconsistent feature lists: {0}")]
    Schema(#[from] SchemaError),
    #[error("Artifacts disagree: {0}")]
    Mismatch(#[from] InferenceError),
    #[error("Model format {0} requires the `onnx` feature")]
    UnsupportedFormat(ModelFormat),
}
