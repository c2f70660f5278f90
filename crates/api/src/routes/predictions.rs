//! Prediction Routes

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::{DateTime, Utc};
use data_validator::GeoIndex;
use feature_engine::RawInputRecord;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{ApiError, SharedState};

/// Prediction request body.
///
/// Any field may be omitted. Omitted coordinates default to the position
/// `/api/v1/locations` advertises for the selected neighbourhood.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(flatten)]
    pub record: RawInputRecord,
}

impl PredictionRequest {
    /// Resolve the record that will be validated and priced
    pub fn into_record(self, geo: &GeoIndex) -> RawInputRecord {
        let mut record = self.record;
        let default = match (record.borough.value(), record.neighbourhood.value()) {
            (Some(borough), Some(neighbourhood)) => {
                geo.bounds(borough, neighbourhood).map(|b| b.default_position())
            }
            _ => None,
        };

        if let Some(latitude) = self.latitude.or(default.map(|(lat, _)| lat)) {
            record.latitude = latitude;
        }
        if let Some(longitude) = self.longitude.or(default.map(|(_, lon)| lon)) {
            record.longitude = longitude;
        }
        record
    }
}

/// Response for predictions endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Nightly price in USD
    pub price_usd: f64,
    /// Regressor output before the inverse log transform
    pub log_price: f64,
    /// Price formatted for display, e.g. `$1,234.56`
    pub display: String,
    /// Coordinates the prediction used
    pub latitude: f64,
    pub longitude: f64,
}

/// Predict the nightly price of a listing
pub async fn create_prediction(
    State(state): State<SharedState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        counter!("price_prediction_rejections_total", "reason" => "malformed").increment(1);
        ApiError::BadRequest(e.body_text())
    })?;

    let start = std::time::Instant::now();
    let request_id = Uuid::new_v4();
    let geo = state.context.geo();
    let record = request.into_record(geo);

    let validation = state.validator.validate_record(&record, Some(geo));
    if !validation.valid {
        counter!("price_prediction_rejections_total", "reason" => "validation").increment(1);
        debug!(%request_id, "Rejected {} of {} fields", validation.errors.len(), validation.fields_checked);
        return Err(ApiError::Validation(validation.errors));
    }

    let prediction = state.context.predict_price(&record)?;
    let formatted = format_usd(prediction.price_usd);

    counter!("price_predictions_total").increment(1);
    histogram!("price_prediction_duration_seconds").record(start.elapsed().as_secs_f64());
    info!(%request_id, "Predicted {} per night", formatted);

    Ok(Json(PredictionResponse {
        request_id,
        timestamp: Utc::now(),
        price_usd: prediction.price_usd,
        log_price: prediction.log_price,
        display: formatted,
        latitude: record.latitude,
        longitude: record.longitude,
    }))
}

/// Format a USD amount with thousands separators and two decimals
pub fn format_usd(amount: f64) -> String {
    let total_cents = (amount.abs() * 100.0).round() as u64;
    let digits = (total_cents / 100).to_string();

    let mut dollars = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            dollars.push(',');
        }
        dollars.push(ch);
    }

    let sign = if amount < 0.0 && total_cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, dollars, total_cents % 100)
}
