//! Loader Implementation

use crate::paths::{ArtifactPaths, ModelFormat};
use crate::ArtifactError;
use data_validator::GeoIndex;
use feature_engine::FeatureSchema;
use inference_engine::{
    FittedScaler, LinearParams, LinearRegressor, PredictionContext, Regressor, ScalerParams,
    TreeEnsembleParams, TreeEnsembleRegressor,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Load every artifact and bind them into a context
pub fn load_context(paths: &ArtifactPaths) -> Result<PredictionContext, ArtifactError> {
    ArtifactLoader::new(paths.clone()).load()
}

/// Reads artifacts from the locations in [`ArtifactPaths`]
pub struct ArtifactLoader {
    paths: ArtifactPaths,
}

impl ArtifactLoader {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self { paths }
    }

    /// Load all five artifacts; the first failure aborts the whole load
    pub fn load(&self) -> Result<PredictionContext, ArtifactError> {
        let schema = Arc::new(self.load_schema()?);
        let scaler = self.load_scaler()?;
        let model = self.load_model(&schema)?;
        let geo = self.load_geo()?;

        let context = PredictionContext::new(schema, Arc::new(scaler), model, geo)?;
        info!("All artifacts loaded from {}", self.paths.dir.display());
        Ok(context)
    }

    pub fn load_schema(&self) -> Result<FeatureSchema, ArtifactError> {
        let scaler_columns: Vec<String> = self.read_json("scaler_features", &self.paths.scaler_features)?;
        let model_columns: Vec<String> = self.read_json("model_features", &self.paths.model_features)?;
        Ok(FeatureSchema::new(scaler_columns, model_columns)?)
    }

    pub fn load_scaler(&self) -> Result<FittedScaler, ArtifactError> {
        let params: ScalerParams = self.read_json("scaler", &self.paths.scaler)?;
        FittedScaler::from_params(params).map_err(|e| self.malformed("scaler", &self.paths.scaler, e))
    }

    pub fn load_model(&self, schema: &FeatureSchema) -> Result<Arc<dyn Regressor>, ArtifactError> {
        let path = &self.paths.model;
        let model: Arc<dyn Regressor> = match self.paths.model_format {
            ModelFormat::Linear => {
                let params: LinearParams = self.read_json("model", path)?;
                Arc::new(
                    LinearRegressor::from_params(params)
                        .map_err(|e| self.malformed("model", path, e))?,
                )
            }
            ModelFormat::TreeEnsemble => {
                let params: TreeEnsembleParams = self.read_json("model", path)?;
                Arc::new(
                    TreeEnsembleRegressor::from_params(params)
                        .map_err(|e| self.malformed("model", path, e))?,
                )
            }
            ModelFormat::Onnx => self.load_onnx(path, schema.model_width())?,
        };

        info!(
            "Loaded {} model with {} inputs",
            self.paths.model_format,
            model.n_features()
        );
        Ok(model)
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(&self, path: &Path, n_features: usize) -> Result<Arc<dyn Regressor>, ArtifactError> {
        let resolved = self.paths.resolve(path);
        if let Err(source) = std::fs::metadata(&resolved) {
            return Err(ArtifactError::Missing {
                artifact: "model",
                path: resolved,
                source,
            });
        }
        let model = inference_engine::OnnxRegressor::load(&resolved, n_features)
            .map_err(|e| self.malformed("model", path, e))?;
        Ok(Arc::new(model))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(&self, _path: &Path, _n_features: usize) -> Result<Arc<dyn Regressor>, ArtifactError> {
        Err(ArtifactError::UnsupportedFormat(ModelFormat::Onnx))
    }

    pub fn load_geo(&self) -> Result<GeoIndex, ArtifactError> {
        let path = &self.paths.geo_data;
        let text = self.read_text("geo_data", path)?;
        let geo = GeoIndex::from_json(&text).map_err(|e| self.malformed("geo_data", path, e))?;
        if geo.is_empty() {
            warn!("Geo data at {} has no neighbourhoods", self.paths.resolve(path).display());
        }
        Ok(geo)
    }

    fn read_text(&self, artifact: &'static str, path: &Path) -> Result<String, ArtifactError> {
        let resolved = self.paths.resolve(path);
        let text = std::fs::read_to_string(&resolved).map_err(|source| ArtifactError::Missing {
            artifact,
            path: resolved.clone(),
            source,
        })?;
        info!("Read {} ({} bytes) from {}", artifact, text.len(), resolved.display());
        Ok(text)
    }

    fn read_json<T: DeserializeOwned>(&self, artifact: &'static str, path: &Path) -> Result<T, ArtifactError> {
        let text = self.read_text(artifact, path)?;
        serde_json::from_str(&text).map_err(|e| self.malformed(artifact, path, e))
    }

    fn malformed(&self, artifact: &'static str, path: &Path, reason: impl ToString) -> ArtifactError {
        ArtifactError::Malformed {
            artifact,
            path: self.resolved(path),
            reason: reason.to_string(),
        }
    }

    fn resolved(&self, path: &Path) -> PathBuf {
        self.paths.resolve(path)
    }
}
