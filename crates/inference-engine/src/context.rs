//! Immutable prediction context shared across requests

use crate::pipeline::{PredictionPipeline, PricePrediction};
use crate::regressor::Regressor;
use crate::scaler::Scaler;
use crate::InferenceError;
use data_validator::GeoIndex;
use feature_engine::{DenseFeatureVector, FeatureSchema, FeatureVectorBuilder, RawInputRecord};
use std::sync::Arc;
use tracing::info;

/// Schema, scaler, regressor and geo bounds, loaded once at startup.
///
/// Read-only after construction; every request allocates its own vector
/// and frames, so one context can serve concurrent requests without locks.
#[derive(Debug, Clone)]
pub struct PredictionContext {
    builder: FeatureVectorBuilder,
    pipeline: PredictionPipeline,
    geo: Arc<GeoIndex>,
}

impl PredictionContext {
    pub fn new(
        schema: Arc<FeatureSchema>,
        scaler: Arc<dyn Scaler>,
        model: Arc<dyn Regressor>,
        geo: GeoIndex,
    ) -> Result<Self, InferenceError> {
        let pipeline = PredictionPipeline::new(Arc::clone(&schema), scaler, model)?;
        info!(
            "Prediction context ready: {} scaler columns, {} model columns, {} neighbourhoods",
            schema.scaler_width(),
            schema.model_width(),
            geo.neighbourhood_count()
        );

        Ok(Self {
            builder: FeatureVectorBuilder::new(schema),
            pipeline,
            geo: Arc::new(geo),
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.builder.schema()
    }

    pub fn geo(&self) -> &GeoIndex {
        &self.geo
    }

    pub fn builder(&self) -> &FeatureVectorBuilder {
        &self.builder
    }

    pub fn pipeline(&self) -> &PredictionPipeline {
        &self.pipeline
    }

    /// Encode a record without predicting
    pub fn build(&self, raw: &RawInputRecord) -> DenseFeatureVector {
        self.builder.build(raw)
    }

    /// Raw record in, nightly USD price out
    pub fn predict_price(&self, raw: &RawInputRecord) -> Result<PricePrediction, InferenceError> {
        let vector = self.builder.build(raw);
        self.pipeline.predict(&vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regressor::{LinearParams, LinearRegressor};
    use crate::scaler::{FittedScaler, ScalerParams};
    use data_validator::GeoBounds;
    use feature_engine::{Selection, Superhost};

    const SCALER_COLUMNS: &[&str] = &[
        "latitude",
        "longitude",
        "accommodates",
        "bedrooms",
        "beds",
        "minimum_nights",
        "review_scores_rating",
        "review_scores_cleanliness",
        "review_scores_location",
        "neighbourhood_group_cleansed_Manhattan",
        "neighbourhood_cleansed_Harlem",
        "room_type_Private_room",
        "host_is_superhost_t",
        "host_response_rate_90",
        "host_response_rate_100",
        "host_acceptance_rate_90",
        "host_acceptance_rate_100",
    ];

    const MODEL_COLUMNS: &[&str] = &[
        "room_type_Private_room",
        "accommodates",
        "host_is_superhost_t",
        "neighbourhood_cleansed_Harlem",
        "review_scores_rating",
    ];

    fn context() -> PredictionContext {
        let to_strings = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let schema =
            Arc::new(FeatureSchema::new(to_strings(SCALER_COLUMNS), to_strings(MODEL_COLUMNS)).unwrap());

        let n = SCALER_COLUMNS.len();
        let scaler = FittedScaler::from_params(ScalerParams::Standard {
            mean: vec![0.0; n],
            scale: vec![1.0; n],
        })
        .unwrap();
        let model = LinearRegressor::from_params(LinearParams {
            intercept: 4.0,
            coefficients: vec![-0.4, 0.1, 0.05, 0.2, 0.02],
        })
        .unwrap();

        let mut geo = GeoIndex::default();
        geo.insert("Manhattan", "Harlem", GeoBounds::new(40.7995, 40.8345, -73.9597, -73.9300));

        PredictionContext::new(schema, Arc::new(scaler), Arc::new(model), geo).unwrap()
    }

    fn harlem_record(ctx: &PredictionContext, superhost: &str) -> RawInputRecord {
        let (latitude, longitude) = ctx.geo().bounds("Manhattan", "Harlem").unwrap().midpoint();
        RawInputRecord {
            borough: Selection::new("Manhattan"),
            neighbourhood: Selection::new("Harlem"),
            latitude,
            longitude,
            accommodates: 2,
            bedrooms: 1,
            beds: 1,
            minimum_nights: 1,
            room_type: Selection::new("Private room"),
            property_type: Selection::Other,
            host_is_superhost: Superhost::from(superhost),
            host_response_rate: 95.0,
            host_acceptance_rate: 90.0,
            review_scores_rating: 4.5,
            review_scores_cleanliness: 4.5,
            review_scores_location: 4.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_harlem_private_room() {
        let ctx = context();
        let record = harlem_record(&ctx, "Ya");

        let prediction = ctx.predict_price(&record).unwrap();
        assert!(prediction.price_usd.is_finite());
        assert!(prediction.price_usd > 0.0);

        // 4.0 - 0.4 + 0.2 + 0.05 + 0.2 + 0.09
        assert!((prediction.log_price - 4.14).abs() < 1e-9);
    }

    #[test]
    fn test_superhost_no_keeps_indicator_off() {
        let ctx = context();
        let yes = ctx.build(&harlem_record(&ctx, "Ya"));
        let no = ctx.build(&harlem_record(&ctx, "Tidak"));

        assert_eq!(yes.get("host_is_superhost_t"), Some(1.0));
        assert_eq!(no.get("host_is_superhost_t"), Some(0.0));

        let with = ctx.predict_price(&harlem_record(&ctx, "Ya")).unwrap();
        let without = ctx.predict_price(&harlem_record(&ctx, "Tidak")).unwrap();
        assert!(without.price_usd < with.price_usd);
    }

    #[test]
    fn test_rate_95_between_buckets() {
        let ctx = context();
        let vector = ctx.build(&harlem_record(&ctx, "Ya"));

        // 95 is equidistant from 90 and 100; 90 is listed first
        assert_eq!(vector.get("host_response_rate_90"), Some(1.0));
        assert_eq!(vector.get("host_response_rate_100"), Some(0.0));
        assert_eq!(vector.get("host_acceptance_rate_90"), Some(1.0));
    }

    #[test]
    fn test_shared_context_across_threads() {
        let ctx = Arc::new(context());
        let record = harlem_record(&ctx, "Ya");
        let expected = ctx.predict_price(&record).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                let record = record.clone();
                std::thread::spawn(move || ctx.predict_price(&record).unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }
}
