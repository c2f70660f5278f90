//! Raw user inputs for one prediction request

use serde::{Deserialize, Serialize};

/// Sentinel category with no dedicated column
pub const OTHER: &str = "other";

/// Legacy spelling of the sentinel accepted from older form clients
const OTHER_LEGACY: &str = "Lainnya";

/// A categorical selection: either the baseline sentinel or a named value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Selection {
    /// Baseline category, encoded as all zeros
    #[default]
    Other,
    /// Named category, matched against the schema as-is
    Value(String),
}

impl Selection {
    pub fn new(value: impl Into<String>) -> Self {
        Self::from(value.into())
    }

    /// The named value, or `None` for the sentinel
    pub fn value(&self) -> Option<&str> {
        match self {
            Selection::Other => None,
            Selection::Value(value) => Some(value),
        }
    }
}

impl From<String> for Selection {
    fn from(value: String) -> Self {
        if value == OTHER || value == OTHER_LEGACY {
            Selection::Other
        } else {
            Selection::Value(value)
        }
    }
}

impl From<&str> for Selection {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Selection> for String {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::Other => OTHER.to_string(),
            Selection::Value(value) => value,
        }
    }
}

/// Superhost answer; only `Yes` sets the indicator column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Superhost {
    Yes,
    #[default]
    No,
    Unknown,
}

impl Superhost {
    pub fn as_str(&self) -> &'static str {
        match self {
            Superhost::Yes => "yes",
            Superhost::No => "no",
            Superhost::Unknown => "unknown",
        }
    }
}

impl From<String> for Superhost {
    fn from(value: String) -> Self {
        match value.as_str() {
            "yes" | "Yes" | "Ya" | "true" | "t" => Superhost::Yes,
            "no" | "No" | "Tidak" | "false" | "f" => Superhost::No,
            _ => Superhost::Unknown,
        }
    }
}

impl From<&str> for Superhost {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Superhost> for String {
    fn from(flag: Superhost) -> Self {
        flag.as_str().to_string()
    }
}

/// Snapshot of every user-supplied value for one request.
///
/// Every field has a default, so a request may omit any of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInputRecord {
    // Location
    pub borough: Selection,
    pub neighbourhood: Selection,
    /// Decimal degrees, carried at full precision
    pub latitude: f64,
    pub longitude: f64,

    // Property
    pub accommodates: u32,
    pub bedrooms: u32,
    pub beds: u32,
    pub minimum_nights: u32,
    pub minimum_minimum_nights: u32,
    pub room_type: Selection,
    pub property_type: Selection,

    // Availability
    pub availability_30: u32,
    pub availability_60: u32,
    pub availability_90: u32,
    pub availability_365: u32,
    /// 0 or 1
    pub availability_eoy: u32,

    // Host
    pub host_total_listings_count: u32,
    pub host_is_superhost: Superhost,
    pub host_neighbourhood: Selection,
    /// Percentage, 0-100
    pub host_response_rate: f64,
    /// Percentage, 0-100
    pub host_acceptance_rate: f64,
    pub host_response_time: Selection,

    // Reviews and estimates
    pub number_of_reviews_l30d: u32,
    pub review_scores_rating: f64,
    pub review_scores_cleanliness: f64,
    pub review_scores_location: f64,
    pub estimated_occupancy_l365d: f64,
    pub estimated_revenue_l365d: f64,
}

impl Default for RawInputRecord {
    fn default() -> Self {
        Self {
            borough: Selection::Other,
            neighbourhood: Selection::Other,
            latitude: 0.0,
            longitude: 0.0,
            accommodates: 2,
            bedrooms: 1,
            beds: 1,
            minimum_nights: 1,
            minimum_minimum_nights: 1,
            room_type: Selection::new("Entire home/apt"),
            property_type: Selection::Other,
            availability_30: 15,
            availability_60: 45,
            availability_90: 75,
            availability_365: 300,
            availability_eoy: 0,
            host_total_listings_count: 1,
            host_is_superhost: Superhost::No,
            host_neighbourhood: Selection::Other,
            host_response_rate: 95.0,
            host_acceptance_rate: 90.0,
            host_response_time: Selection::new("within an hour"),
            number_of_reviews_l30d: 1,
            review_scores_rating: 4.5,
            review_scores_cleanliness: 4.5,
            review_scores_location: 4.5,
            estimated_occupancy_l365d: 150.0,
            estimated_revenue_l365d: 5000.0,
        }
    }
}

impl RawInputRecord {
    /// Every categorical field set to its baseline
    pub fn baseline(self) -> Self {
        Self {
            borough: Selection::Other,
            neighbourhood: Selection::Other,
            room_type: Selection::Other,
            property_type: Selection::Other,
            host_is_superhost: Superhost::No,
            host_neighbourhood: Selection::Other,
            host_response_time: Selection::Other,
            ..self
        }
    }
}
