//! Scale, project, predict, invert

use crate::regressor::Regressor;
use crate::scaler::Scaler;
use crate::InferenceError;
use feature_engine::{DenseFeatureVector, FeatureSchema};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Price predicted for one record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePrediction {
    /// Raw regressor output, log1p(price)
    pub log_price: f64,
    /// Nightly price in USD
    pub price_usd: f64,
}

/// Scaler + regressor bound to the schema they were trained on
#[derive(Debug, Clone)]
pub struct PredictionPipeline {
    schema: Arc<FeatureSchema>,
    scaler: Arc<dyn Scaler>,
    model: Arc<dyn Regressor>,
}

impl PredictionPipeline {
    /// Bind artifacts together, rejecting any width disagreement up front
    pub fn new(
        schema: Arc<FeatureSchema>,
        scaler: Arc<dyn Scaler>,
        model: Arc<dyn Regressor>,
    ) -> Result<Self, InferenceError> {
        let pipeline = Self {
            schema,
            scaler,
            model,
        };
        pipeline.check_shapes()?;
        Ok(pipeline)
    }

    /// Scaler width must match the scaler columns and model width the model columns
    pub fn check_shapes(&self) -> Result<(), InferenceError> {
        if self.scaler.n_features() != self.schema.scaler_width() {
            return Err(InferenceError::ShapeMismatch {
                artifact: "scaler",
                expected: self.scaler.n_features(),
                actual: self.schema.scaler_width(),
            });
        }
        if self.model.n_features() != self.schema.model_width() {
            return Err(InferenceError::ShapeMismatch {
                artifact: "regressor",
                expected: self.model.n_features(),
                actual: self.schema.model_width(),
            });
        }
        Ok(())
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Predict the nightly price for a dense vector in scaler column order
    pub fn predict(&self, vector: &DenseFeatureVector) -> Result<PricePrediction, InferenceError> {
        let start = std::time::Instant::now();
        let width = self.schema.scaler_width();

        let row = vector
            .reindex(self.schema.scaler_columns())
            .map_err(|e| {
                error!("Dense vector does not match scaler columns: {}", e);
                InferenceError::SchemaViolation(e)
            })?;
        let frame = Array2::from_shape_vec((1, width), row)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let scaled = self.scaler.transform(frame.view())?;
        if scaled.dim() != (1, width) {
            return Err(InferenceError::ShapeMismatch {
                artifact: "scaler output",
                expected: width,
                actual: scaled.ncols(),
            });
        }

        // Gather model columns from scaler positions, in model order
        let projected = scaled.select(Axis(1), self.schema.projection());

        let outputs = self.model.predict(projected.view())?;
        let log_price = match outputs.as_slice() {
            Some(&[value]) => value,
            _ => {
                return Err(InferenceError::InferenceFailed(format!(
                    "regressor returned {} outputs for one row",
                    outputs.len()
                )))
            }
        };

        let price_usd = log_price.exp_m1();
        if !price_usd.is_finite() {
            return Err(InferenceError::NonFinitePrediction(log_price));
        }
        if price_usd < 0.0 {
            warn!(
                "Negative price {:.4} from log output {:.6}; check schema alignment",
                price_usd, log_price
            );
        }

        debug!(
            "Predicted ${:.2} in {}us",
            price_usd,
            start.elapsed().as_micros()
        );
        Ok(PricePrediction {
            log_price,
            price_usd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regressor::{LinearParams, LinearRegressor};
    use crate::scaler::{FittedScaler, ScalerParams};
    use ndarray::{Array1, ArrayView2};
    use proptest::prelude::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn schema() -> Arc<FeatureSchema> {
        Arc::new(FeatureSchema::new(columns(&["a", "b", "c"]), columns(&["c", "a"])).unwrap())
    }

    fn scaler() -> Arc<dyn Scaler> {
        Arc::new(
            FittedScaler::from_params(ScalerParams::Standard {
                mean: vec![1.0, 2.0, 3.0],
                scale: vec![1.0, 2.0, 4.0],
            })
            .unwrap(),
        )
    }

    fn linear(intercept: f64, coefficients: Vec<f64>) -> Arc<dyn Regressor> {
        Arc::new(
            LinearRegressor::from_params(LinearParams {
                intercept,
                coefficients,
            })
            .unwrap(),
        )
    }

    #[derive(Debug)]
    struct ConstantRegressor(f64);

    impl Regressor for ConstantRegressor {
        fn n_features(&self) -> usize {
            2
        }

        fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>, InferenceError> {
            Ok(Array1::from_elem(rows.nrows(), self.0))
        }
    }

    #[test]
    fn test_projection_uses_model_order() {
        let pipeline = PredictionPipeline::new(schema(), scaler(), linear(0.0, vec![10.0, 1.0])).unwrap();
        let vector = DenseFeatureVector::from_pairs([("a", 3.0), ("b", 0.0), ("c", 15.0)]);

        // scaled: a = 2, b = -1, c = 3; model sees [c, a]
        let prediction = pipeline.predict(&vector).unwrap();
        assert_eq!(prediction.log_price, 32.0);
        assert_eq!(prediction.price_usd, 32.0f64.exp_m1());
    }

    #[test]
    fn test_inverse_log_transform() {
        let pipeline =
            PredictionPipeline::new(schema(), scaler(), linear(5.0f64.ln_1p(), vec![0.0, 0.0])).unwrap();
        let vector = DenseFeatureVector::from_pairs([("a", 0.0), ("b", 0.0), ("c", 0.0)]);

        let prediction = pipeline.predict(&vector).unwrap();
        assert!((prediction.price_usd - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_reordered_vector_is_reindexed() {
        let pipeline = PredictionPipeline::new(schema(), scaler(), linear(0.0, vec![10.0, 1.0])).unwrap();
        let ordered = DenseFeatureVector::from_pairs([("a", 3.0), ("b", 0.0), ("c", 11.0)]);
        let shuffled = DenseFeatureVector::from_pairs([("c", 11.0), ("a", 3.0), ("b", 0.0)]);

        assert_eq!(pipeline.predict(&ordered).unwrap(), pipeline.predict(&shuffled).unwrap());
    }

    #[test]
    fn test_schema_violation() {
        let pipeline = PredictionPipeline::new(schema(), scaler(), linear(0.0, vec![1.0, 1.0])).unwrap();
        let vector = DenseFeatureVector::from_pairs([("a", 1.0), ("b", 1.0)]);

        assert!(matches!(
            pipeline.predict(&vector),
            Err(InferenceError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_width_mismatch_at_construction() {
        let err = PredictionPipeline::new(schema(), scaler(), linear(0.0, vec![1.0, 1.0, 1.0])).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::ShapeMismatch {
                artifact: "regressor",
                expected: 3,
                actual: 2
            }
        ));

        let narrow: Arc<dyn Scaler> = Arc::new(
            FittedScaler::from_params(ScalerParams::Standard {
                mean: vec![0.0, 0.0],
                scale: vec![1.0, 1.0],
            })
            .unwrap(),
        );
        let err = PredictionPipeline::new(schema(), narrow, linear(0.0, vec![1.0, 1.0])).unwrap_err();
        assert!(matches!(err, InferenceError::ShapeMismatch { artifact: "scaler", .. }));
    }

    #[test]
    fn test_negative_price_is_surfaced_not_clamped() {
        let pipeline =
            PredictionPipeline::new(schema(), scaler(), Arc::new(ConstantRegressor(-0.5))).unwrap();
        let vector = DenseFeatureVector::from_pairs([("a", 0.0), ("b", 0.0), ("c", 0.0)]);

        let prediction = pipeline.predict(&vector).unwrap();
        assert!(prediction.price_usd < 0.0);
        assert_eq!(prediction.price_usd, (-0.5f64).exp_m1());
    }

    #[test]
    fn test_non_finite_output_is_an_error() {
        let vector = DenseFeatureVector::from_pairs([("a", 0.0), ("b", 0.0), ("c", 0.0)]);

        for output in [f64::NAN, 1000.0] {
            let pipeline =
                PredictionPipeline::new(schema(), scaler(), Arc::new(ConstantRegressor(output))).unwrap();
            assert!(matches!(
                pipeline.predict(&vector),
                Err(InferenceError::NonFinitePrediction(_))
            ));
        }
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let pipeline = PredictionPipeline::new(schema(), scaler(), linear(0.3, vec![0.7, -0.2])).unwrap();
        let zeros = DenseFeatureVector::from_pairs([("a", 0.0), ("b", 0.0), ("c", 0.0)]);

        let first = pipeline.predict(&zeros).unwrap();
        for _ in 0..10 {
            let next = pipeline.predict(&zeros).unwrap();
            assert_eq!(first.price_usd.to_bits(), next.price_usd.to_bits());
        }
    }

    /// Scaler values, model columns as a shuffled subset of scaler
    /// positions, and the model column a one-hot model reads
    fn projection_case() -> impl Strategy<Value = (Vec<f64>, Vec<usize>, usize)> {
        prop::collection::vec(-5.0f64..5.0, 2..12)
            .prop_flat_map(|values| {
                let positions: Vec<usize> = (0..values.len()).collect();
                let width = positions.len();
                (Just(values), prop::sample::subsequence(positions, 1..=width).prop_shuffle())
            })
            .prop_flat_map(|(values, model)| {
                let width = model.len();
                (Just(values), Just(model), 0..width)
            })
    }

    proptest! {
        #[test]
        fn prop_projection_reads_selected_column((values, model, picked) in projection_case()) {
            let scaler_columns: Vec<String> = (0..values.len()).map(|i| format!("f{i}")).collect();
            let model_columns: Vec<String> = model.iter().map(|&i| scaler_columns[i].clone()).collect();
            let schema = Arc::new(FeatureSchema::new(scaler_columns.clone(), model_columns).unwrap());

            let identity: Arc<dyn Scaler> = Arc::new(
                FittedScaler::from_params(ScalerParams::Standard {
                    mean: vec![0.0; values.len()],
                    scale: vec![1.0; values.len()],
                })
                .unwrap(),
            );
            let mut coefficients = vec![0.0; model.len()];
            coefficients[picked] = 1.0;

            let pipeline = PredictionPipeline::new(schema, identity, linear(0.0, coefficients)).unwrap();
            let vector = DenseFeatureVector::from_pairs(
                scaler_columns.iter().cloned().zip(values.iter().copied()),
            );

            let prediction = pipeline.predict(&vector).unwrap();
            prop_assert_eq!(prediction.log_price, values[model[picked]]);
        }
    }
}
