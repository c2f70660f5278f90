//! Location Routes

use axum::{
    extract::{Path, State},
    Json,
};
use data_validator::GeoBounds;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::{ApiError, SharedState};

/// Borough to neighbourhood names
#[derive(Debug, Serialize)]
pub struct LocationsResponse {
    pub boroughs: BTreeMap<String, Vec<String>>,
}

/// Bounds of one neighbourhood with the default coordinates
#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub borough: String,
    pub neighbourhood: String,
    pub bounds: GeoBounds,
    pub latitude: f64,
    pub longitude: f64,
}

/// List every borough and its neighbourhoods
pub async fn get_locations(State(state): State<SharedState>) -> Json<LocationsResponse> {
    let geo = state.context.geo();
    let boroughs = geo
        .boroughs()
        .map(|borough| {
            let names = geo
                .neighbourhoods(borough)
                .into_iter()
                .map(str::to_string)
                .collect();
            (borough.to_string(), names)
        })
        .collect();

    Json(LocationsResponse { boroughs })
}

/// Get the nudged bounds and midpoint of a neighbourhood
pub async fn get_location(
    State(state): State<SharedState>,
    Path((borough, neighbourhood)): Path<(String, String)>,
) -> Result<Json<LocationResponse>, ApiError> {
    let bounds = state
        .context
        .geo()
        .bounds(&borough, &neighbourhood)
        .ok_or_else(|| ApiError::NotFound(format!("{} / {}", borough, neighbourhood)))?;
    let (latitude, longitude) = bounds.default_position();

    Ok(Json(LocationResponse {
        borough,
        neighbourhood,
        bounds,
        latitude,
        longitude,
    }))
}
