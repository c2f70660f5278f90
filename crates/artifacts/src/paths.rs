//! Artifact locations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Serialization of the trained regressor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    /// JSON intercept and coefficients
    Linear,
    /// JSON tree ensemble
    #[default]
    TreeEnsemble,
    /// ONNX graph
    Onnx,
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelFormat::Linear => "linear",
            ModelFormat::TreeEnsemble => "tree_ensemble",
            ModelFormat::Onnx => "onnx",
        })
    }
}

/// Where each artifact lives; relative paths are resolved against `dir`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub model: PathBuf,
    pub model_format: ModelFormat,
    pub scaler: PathBuf,
    pub model_features: PathBuf,
    pub scaler_features: PathBuf,
    pub geo_data: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            model: PathBuf::from("final_model.json"),
            model_format: ModelFormat::TreeEnsemble,
            scaler: PathBuf::from("scaler.json"),
            model_features: PathBuf::from("final_model_features.json"),
            scaler_features: PathBuf::from("all_scaler_features.json"),
            geo_data: PathBuf::from("geo_data.json"),
        }
    }
}

impl ArtifactPaths {
    /// Default file names under `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.dir.join(path)
    }
}
