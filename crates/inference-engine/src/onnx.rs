//! ONNX regressor using tract

use crate::regressor::Regressor;
use crate::InferenceError;
use ndarray::{Array1, ArrayView2};
use std::path::Path;
use tracing::info;
use tract_onnx::prelude::*;

type OnnxPlan = TypedRunnableModel<TypedModel>;

/// Regressor exported to ONNX with a single `[1, n_features]` f32 input
pub struct OnnxRegressor {
    plan: OnnxPlan,
    n_features: usize,
}

impl std::fmt::Debug for OnnxRegressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxRegressor")
            .field("n_features", &self.n_features)
            .finish()
    }
}

impl OnnxRegressor {
    /// Load and optimize the model for a fixed input width
    pub fn load(path: &Path, n_features: usize) -> Result<Self, InferenceError> {
        info!("Loading ONNX regressor from {}", path.display());

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, n_features]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {e}", path.display())))?;

        Ok(Self { plan, n_features })
    }

    fn run_row(&self, row: &[f32]) -> Result<f64, InferenceError> {
        let input = Tensor::from_shape(&[1, self.n_features], row)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::InferenceFailed("model produced no output".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        view.iter()
            .next()
            .map(|v| f64::from(*v))
            .ok_or_else(|| InferenceError::InferenceFailed("model output is empty".to_string()))
    }
}

impl Regressor for OnnxRegressor {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>, InferenceError> {
        if rows.ncols() != self.n_features {
            return Err(InferenceError::ShapeMismatch {
                artifact: "regressor",
                expected: self.n_features,
                actual: rows.ncols(),
            });
        }

        rows.rows()
            .into_iter()
            .map(|row| {
                let row: Vec<f32> = row.iter().map(|v| *v as f32).collect();
                self.run_row(&row)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Array1::from)
    }
}
