//! Range Checking for Input Records

use crate::error::ValidationError;
use crate::geo::GeoIndex;
use feature_engine::RawInputRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Limits enforced by the input form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordLimits {
    pub accommodates: (f64, f64),
    pub bedrooms: (f64, f64),
    pub beds: (f64, f64),
    pub minimum_nights: (f64, f64),
    pub availability_30: (f64, f64),
    pub availability_60: (f64, f64),
    pub availability_90: (f64, f64),
    pub availability_365: (f64, f64),
    pub availability_eoy: (f64, f64),
    pub host_total_listings_count: (f64, f64),
    /// Response and acceptance rates (%)
    pub rate: (f64, f64),
    pub number_of_reviews_l30d: (f64, f64),
    pub review_score: (f64, f64),
}

impl Default for RecordLimits {
    fn default() -> Self {
        Self {
            accommodates: (1.0, 16.0),
            bedrooms: (0.0, 10.0),
            beds: (0.0, 20.0),
            minimum_nights: (1.0, f64::MAX),
            availability_30: (0.0, 30.0),
            availability_60: (0.0, 60.0),
            availability_90: (0.0, 90.0),
            availability_365: (0.0, 365.0),
            availability_eoy: (0.0, 1.0),
            host_total_listings_count: (1.0, f64::MAX),
            rate: (0.0, 100.0),
            number_of_reviews_l30d: (0.0, 10.0),
            review_score: (1.0, 5.0),
        }
    }
}

/// Result of validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether all values are valid
    pub valid: bool,
    /// List of validation errors
    pub errors: Vec<ValidationError>,
    /// Number of fields validated
    pub fields_checked: usize,
}

impl ValidationResult {
    fn from_errors(errors: Vec<ValidationError>, fields_checked: usize) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            fields_checked,
        }
    }
}

/// Record validator used by the input boundary.
///
/// The feature pipeline itself never re-checks these ranges.
pub struct Validator {
    limits: RecordLimits,
}

impl Validator {
    /// Create a new validator with given limits
    pub fn new(limits: RecordLimits) -> Self {
        Self { limits }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    /// Check every form-limited field, plus the coordinates against the
    /// selected neighbourhood when `geo` knows it.
    pub fn validate_record(&self, record: &RawInputRecord, geo: Option<&GeoIndex>) -> ValidationResult {
        let limits = &self.limits;
        let checks: [(&'static str, f64, (f64, f64)); 17] = [
            ("accommodates", f64::from(record.accommodates), limits.accommodates),
            ("bedrooms", f64::from(record.bedrooms), limits.bedrooms),
            ("beds", f64::from(record.beds), limits.beds),
            ("minimum_nights", f64::from(record.minimum_nights), limits.minimum_nights),
            (
                "minimum_minimum_nights",
                f64::from(record.minimum_minimum_nights),
                limits.minimum_nights,
            ),
            ("availability_30", f64::from(record.availability_30), limits.availability_30),
            ("availability_60", f64::from(record.availability_60), limits.availability_60),
            ("availability_90", f64::from(record.availability_90), limits.availability_90),
            ("availability_365", f64::from(record.availability_365), limits.availability_365),
            ("availability_eoy", f64::from(record.availability_eoy), limits.availability_eoy),
            (
                "host_total_listings_count",
                f64::from(record.host_total_listings_count),
                limits.host_total_listings_count,
            ),
            ("host_response_rate", record.host_response_rate, limits.rate),
            ("host_acceptance_rate", record.host_acceptance_rate, limits.rate),
            (
                "number_of_reviews_l30d",
                f64::from(record.number_of_reviews_l30d),
                limits.number_of_reviews_l30d,
            ),
            ("review_scores_rating", record.review_scores_rating, limits.review_score),
            ("review_scores_cleanliness", record.review_scores_cleanliness, limits.review_score),
            ("review_scores_location", record.review_scores_location, limits.review_score),
        ];

        let mut errors: Vec<ValidationError> = checks
            .iter()
            .filter_map(|&(field, value, range)| self.validate_range(field, value, range).err())
            .collect();
        let mut fields_checked = checks.len();

        if let Some(geo) = geo {
            fields_checked += 2;
            errors.extend(self.validate_location(record, geo));
        }

        if !errors.is_empty() {
            debug!("Record rejected with {} errors", errors.len());
        }
        ValidationResult::from_errors(errors, fields_checked)
    }

    fn validate_location(&self, record: &RawInputRecord, geo: &GeoIndex) -> Vec<ValidationError> {
        let (Some(borough), Some(neighbourhood)) =
            (record.borough.value(), record.neighbourhood.value())
        else {
            return Vec::new();
        };

        let Some(bounds) = geo.bounds(borough, neighbourhood) else {
            return vec![ValidationError::UnknownLocation {
                borough: borough.to_string(),
                neighbourhood: neighbourhood.to_string(),
            }];
        };

        [
            ("latitude", record.latitude, (bounds.lat_min, bounds.lat_max)),
            ("longitude", record.longitude, (bounds.lon_min, bounds.lon_max)),
        ]
        .into_iter()
        .filter_map(|(field, value, range)| self.validate_range(field, value, range).err())
        .collect()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(RecordLimits::default())
    }
}
