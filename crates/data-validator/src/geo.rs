//! Neighbourhood Bounding Boxes

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Minimum width of a bounds axis, in decimal degrees
pub const BOUNDS_EPSILON: f64 = 1e-4;

/// Slider resolution for coordinates (micro-degrees)
pub const COORDINATE_STEP: f64 = 1e-6;

/// Rectangle in decimal degrees with a non-degenerate range on both axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl GeoBounds {
    /// Create bounds, nudging a collapsed or inverted max to `min + BOUNDS_EPSILON`
    pub fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max: nudge(lat_min, lat_max),
            lon_min,
            lon_max: nudge(lon_min, lon_max),
        }
    }

    pub fn midpoint(&self) -> (f64, f64) {
        (
            (self.lat_min + self.lat_max) / 2.0,
            (self.lon_min + self.lon_max) / 2.0,
        )
    }

    /// Default slider position: the midpoint snapped to `COORDINATE_STEP`
    pub fn default_position(&self) -> (f64, f64) {
        let (latitude, longitude) = self.midpoint();
        (snap(latitude), snap(longitude))
    }

    /// Inclusive containment check
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&latitude)
            && (self.lon_min..=self.lon_max).contains(&longitude)
    }
}

fn snap(value: f64) -> f64 {
    (value / COORDINATE_STEP).round() * COORDINATE_STEP
}

fn nudge(min: f64, max: f64) -> f64 {
    if min >= max {
        min + BOUNDS_EPSILON
    } else {
        max
    }
}

/// Coordinate as found in the geo file: a number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    fn to_f64(&self, location: &str, field: &str) -> Result<f64, ValidationError> {
        let value = match self {
            Coordinate::Number(value) => *value,
            Coordinate::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                ValidationError::InvalidFormat(format!("{location} {field}: {text:?} is not a number"))
            })?,
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(ValidationError::InvalidFormat(format!(
                "{location} {field}: {value} is not finite"
            )))
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawBounds {
    lat_min: Coordinate,
    lat_max: Coordinate,
    lon_min: Coordinate,
    lon_max: Coordinate,
}

/// Region -> subregion -> bounds, with every entry already nudged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoIndex {
    regions: BTreeMap<String, BTreeMap<String, GeoBounds>>,
}

impl GeoIndex {
    /// Parse the nested geo document, coercing coordinates to `f64`
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let raw: BTreeMap<String, BTreeMap<String, RawBounds>> = serde_json::from_str(json)
            .map_err(|e| ValidationError::InvalidFormat(format!("geo data: {e}")))?;

        let mut regions = BTreeMap::new();
        let mut nudged = 0usize;
        for (borough, neighbourhoods) in raw {
            let mut entries = BTreeMap::new();
            for (neighbourhood, bounds) in neighbourhoods {
                let location = format!("{borough}/{neighbourhood}");
                let lat_min = bounds.lat_min.to_f64(&location, "lat_min")?;
                let lat_max = bounds.lat_max.to_f64(&location, "lat_max")?;
                let lon_min = bounds.lon_min.to_f64(&location, "lon_min")?;
                let lon_max = bounds.lon_max.to_f64(&location, "lon_max")?;

                if lat_min >= lat_max || lon_min >= lon_max {
                    debug!("Nudging degenerate bounds for {}", location);
                    nudged += 1;
                }
                entries.insert(neighbourhood, GeoBounds::new(lat_min, lat_max, lon_min, lon_max));
            }
            regions.insert(borough, entries);
        }

        let index = Self { regions };
        info!(
            "Loaded geo bounds: {} boroughs, {} neighbourhoods ({} nudged)",
            index.regions.len(),
            index.neighbourhood_count(),
            nudged
        );
        Ok(index)
    }

    /// Add or replace one entry
    pub fn insert(&mut self, borough: &str, neighbourhood: &str, bounds: GeoBounds) {
        let bounds = GeoBounds::new(bounds.lat_min, bounds.lat_max, bounds.lon_min, bounds.lon_max);
        self.regions
            .entry(borough.to_string())
            .or_default()
            .insert(neighbourhood.to_string(), bounds);
    }

    pub fn boroughs(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    /// Neighbourhood names of a borough (empty for an unknown borough)
    pub fn neighbourhoods(&self, borough: &str) -> Vec<&str> {
        self.regions
            .get(borough)
            .map(|n| n.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn bounds(&self, borough: &str, neighbourhood: &str) -> Option<GeoBounds> {
        self.regions.get(borough)?.get(neighbourhood).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn neighbourhood_count(&self) -> usize {
        self.regions.values().map(BTreeMap::len).sum()
    }
}
