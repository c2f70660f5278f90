//! Fitted Feature Scalers

use crate::InferenceError;
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Deterministic per-column transform fit offline
pub trait Scaler: Send + Sync + Debug {
    /// Number of columns the scaler was fit on
    fn n_features(&self) -> usize;

    /// Transform rows of width `n_features()` into rows of the same shape
    fn transform(&self, rows: ArrayView2<'_, f64>) -> Result<Array2<f64>, InferenceError>;
}

/// Serialized scaler attributes, named after scikit-learn's
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerParams {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalerKind {
    Standard,
    MinMax,
}

/// Affine scaler loaded from [`ScalerParams`]
#[derive(Debug, Clone)]
pub struct FittedScaler {
    kind: ScalerKind,
    offset: Array1<f64>,
    scale: Array1<f64>,
}

impl FittedScaler {
    pub fn from_params(params: ScalerParams) -> Result<Self, InferenceError> {
        let (kind, offset, mut scale) = match params {
            ScalerParams::Standard { mean, scale } => (ScalerKind::Standard, mean, scale),
            ScalerParams::MinMax { min, scale } => (ScalerKind::MinMax, min, scale),
        };

        if offset.len() != scale.len() {
            return Err(InferenceError::ShapeMismatch {
                artifact: "scaler scale",
                expected: offset.len(),
                actual: scale.len(),
            });
        }
        if offset.is_empty() {
            return Err(InferenceError::ModelLoadError(
                "scaler has no columns".to_string(),
            ));
        }
        if offset.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err(InferenceError::ModelLoadError(
                "scaler parameters must be finite".to_string(),
            ));
        }

        // Constant columns are fit with a zero scale; divide by one instead
        if kind == ScalerKind::Standard {
            for s in scale.iter_mut().filter(|s| **s == 0.0) {
                *s = 1.0;
            }
        }

        Ok(Self {
            kind,
            offset: Array1::from(offset),
            scale: Array1::from(scale),
        })
    }
}

impl Scaler for FittedScaler {
    fn n_features(&self) -> usize {
        self.offset.len()
    }

    fn transform(&self, rows: ArrayView2<'_, f64>) -> Result<Array2<f64>, InferenceError> {
        if rows.ncols() != self.n_features() {
            return Err(InferenceError::ShapeMismatch {
                artifact: "scaler",
                expected: self.n_features(),
                actual: rows.ncols(),
            });
        }

        Ok(match self.kind {
            ScalerKind::Standard => (&rows - &self.offset) / &self.scale,
            ScalerKind::MinMax => &rows * &self.scale + &self.offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_transform() {
        let scaler = FittedScaler::from_params(ScalerParams::Standard {
            mean: vec![1.0, 10.0],
            scale: vec![2.0, 5.0],
        })
        .unwrap();

        let out = scaler.transform(array![[3.0, 0.0]].view()).unwrap();
        assert_eq!(out, array![[1.0, -2.0]]);
    }

    #[test]
    fn test_zero_scale_is_treated_as_one() {
        let scaler = FittedScaler::from_params(ScalerParams::Standard {
            mean: vec![4.0],
            scale: vec![0.0],
        })
        .unwrap();

        let out = scaler.transform(array![[6.0]].view()).unwrap();
        assert_eq!(out, array![[2.0]]);
    }

    #[test]
    fn test_min_max_transform() {
        let scaler = FittedScaler::from_params(ScalerParams::MinMax {
            min: vec![-0.5, 0.0],
            scale: vec![0.25, 0.1],
        })
        .unwrap();

        let out = scaler.transform(array![[2.0, 10.0]].view()).unwrap();
        assert_eq!(out, array![[0.0, 1.0]]);
    }

    #[test]
    fn test_width_mismatch() {
        let scaler = FittedScaler::from_params(ScalerParams::Standard {
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 1.0],
        })
        .unwrap();

        let err = scaler.transform(array![[1.0, 2.0, 3.0]].view()).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::ShapeMismatch { expected: 2, actual: 3, .. }
        ));
    }

    #[test]
    fn test_invalid_params() {
        assert!(FittedScaler::from_params(ScalerParams::Standard {
            mean: vec![0.0, 1.0],
            scale: vec![1.0],
        })
        .is_err());
        assert!(FittedScaler::from_params(ScalerParams::MinMax {
            min: vec![],
            scale: vec![],
        })
        .is_err());
        assert!(FittedScaler::from_params(ScalerParams::Standard {
            mean: vec![f64::NAN],
            scale: vec![1.0],
        })
        .is_err());
    }

    #[test]
    fn test_params_from_json() {
        let params: ScalerParams =
            serde_json::from_str(r#"{"kind": "standard", "mean": [1.5], "scale": [0.5]}"#).unwrap();
        assert_eq!(
            params,
            ScalerParams::Standard {
                mean: vec![1.5],
                scale: vec![0.5]
            }
        );
    }
}
