//! Feature Schema and Categorical Group Index

use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Boolean column set when the host is a superhost
pub const SUPERHOST_COLUMN: &str = "host_is_superhost_t";

/// Room types offered by the input form (the first is the baseline)
const ROOM_TYPE_OPTIONS: [&str; 3] = ["Entire home/apt", "Private room", "Shared room"];

/// Host response times offered by the input form
const HOST_RESPONSE_TIME_OPTIONS: [&str; 2] = [crate::OTHER, "within an hour"];

/// Categorical field encoded as a prefix-based one-hot group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OneHotGroup {
    Borough,
    Neighbourhood,
    RoomType,
    PropertyType,
    HostNeighbourhood,
    HostResponseTime,
}

impl OneHotGroup {
    /// All groups, in encoding order
    pub const ALL: [OneHotGroup; 6] = [
        OneHotGroup::Borough,
        OneHotGroup::Neighbourhood,
        OneHotGroup::RoomType,
        OneHotGroup::PropertyType,
        OneHotGroup::HostNeighbourhood,
        OneHotGroup::HostResponseTime,
    ];

    /// Column name prefix shared by every member of the group
    pub fn prefix(&self) -> &'static str {
        match self {
            OneHotGroup::Borough => "neighbourhood_group_cleansed_",
            OneHotGroup::Neighbourhood => "neighbourhood_cleansed_",
            OneHotGroup::RoomType => "room_type_",
            OneHotGroup::PropertyType => "property_type_",
            OneHotGroup::HostNeighbourhood => "host_neighbourhood_",
            OneHotGroup::HostResponseTime => "host_response_time_",
        }
    }

    /// Candidate column for a category value (spaces become underscores)
    pub fn column_for(&self, value: &str) -> String {
        format!("{}{}", self.prefix(), value.replace(' ', "_"))
    }
}

/// Percentage field encoded by nearest bucket boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateGroup {
    ResponseRate,
    AcceptanceRate,
}

impl RateGroup {
    pub const ALL: [RateGroup; 2] = [RateGroup::ResponseRate, RateGroup::AcceptanceRate];

    pub fn prefix(&self) -> &'static str {
        match self {
            RateGroup::ResponseRate => "host_response_rate_",
            RateGroup::AcceptanceRate => "host_acceptance_rate_",
        }
    }
}

/// One column of a one-hot group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    /// Column suffix after the group prefix
    pub suffix: String,
    /// Position in the scaler column order
    pub position: usize,
}

/// One column of a bucketed rate group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateBucket {
    /// Integer boundary embedded in the column suffix
    pub boundary: u64,
    /// Position in the scaler column order
    pub position: usize,
}

/// Prefix groups discovered once from the scaler columns.
///
/// Members are kept in scaler column order, which is also the tie-break
/// order for nearest-bucket selection.
#[derive(Debug, Clone, Default)]
pub struct CategoricalIndex {
    groups: HashMap<OneHotGroup, Vec<GroupMember>>,
    buckets: HashMap<RateGroup, Vec<RateBucket>>,
}

impl CategoricalIndex {
    /// Scan an ordered column list for group and bucket members
    pub fn from_columns(columns: &[String]) -> Self {
        let mut index = Self::default();

        for (position, column) in columns.iter().enumerate() {
            for group in OneHotGroup::ALL {
                if let Some(suffix) = column.strip_prefix(group.prefix()) {
                    index.groups.entry(group).or_default().push(GroupMember {
                        suffix: suffix.to_string(),
                        position,
                    });
                }
            }

            for rate in RateGroup::ALL {
                let Some(suffix) = column.strip_prefix(rate.prefix()) else {
                    continue;
                };
                let digits: String = suffix.chars().filter(char::is_ascii_digit).collect();
                match digits.parse::<u64>() {
                    Ok(boundary) => index
                        .buckets
                        .entry(rate)
                        .or_default()
                        .push(RateBucket { boundary, position }),
                    Err(_) => debug!("Rate column {} carries no bucket boundary", column),
                }
            }
        }

        index
    }

    /// Columns of a one-hot group, in schema order
    pub fn members(&self, group: OneHotGroup) -> &[GroupMember] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bucket columns of a rate group, in schema order
    pub fn buckets(&self, rate: RateGroup) -> &[RateBucket] {
        self.buckets.get(&rate).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bucket whose boundary is closest to `rate`.
    ///
    /// Ties go to the bucket that appears first in schema order.
    pub fn nearest_bucket(&self, group: RateGroup, rate: f64) -> Option<&RateBucket> {
        let mut best: Option<(&RateBucket, f64)> = None;
        for bucket in self.buckets(group) {
            let distance = (bucket.boundary as f64 - rate).abs();
            if best.map_or(true, |(_, closest)| distance < closest) {
                best = Some((bucket, distance));
            }
        }
        best.map(|(bucket, _)| bucket)
    }

    /// Values a user may pick for a group; the sentinel comes first.
    pub fn options(&self, group: OneHotGroup) -> Vec<String> {
        match group {
            OneHotGroup::RoomType => ROOM_TYPE_OPTIONS.iter().map(|s| s.to_string()).collect(),
            OneHotGroup::HostResponseTime => HOST_RESPONSE_TIME_OPTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            _ => {
                let discovered: BTreeSet<String> = self
                    .members(group)
                    .iter()
                    .map(|member| member.suffix.replace('_', " "))
                    .collect();
                std::iter::once(crate::OTHER.to_string())
                    .chain(discovered)
                    .collect()
            }
        }
    }
}

/// Ordered column lists for the scaler and the regressor.
///
/// Built once when artifacts are loaded and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    scaler_columns: Arc<[String]>,
    model_columns: Vec<String>,
    positions: HashMap<String, usize>,
    /// Scaler position of each model column, in model order
    projection: Vec<usize>,
    categories: CategoricalIndex,
}

impl FeatureSchema {
    /// Create a schema, checking that the model columns are a subset of the scaler columns
    pub fn new(scaler_columns: Vec<String>, model_columns: Vec<String>) -> Result<Self, SchemaError> {
        if scaler_columns.is_empty() {
            return Err(SchemaError::EmptyScalerColumns);
        }
        if model_columns.is_empty() {
            return Err(SchemaError::EmptyModelColumns);
        }

        let mut positions = HashMap::with_capacity(scaler_columns.len());
        for (position, column) in scaler_columns.iter().enumerate() {
            if positions.insert(column.clone(), position).is_some() {
                return Err(SchemaError::DuplicateScalerColumn(column.clone()));
            }
        }

        let mut seen = HashSet::with_capacity(model_columns.len());
        let mut projection = Vec::with_capacity(model_columns.len());
        for column in &model_columns {
            if !seen.insert(column.as_str()) {
                return Err(SchemaError::DuplicateModelColumn(column.clone()));
            }
            let position = positions
                .get(column)
                .copied()
                .ok_or_else(|| SchemaError::UnknownModelColumn(column.clone()))?;
            projection.push(position);
        }

        let categories = CategoricalIndex::from_columns(&scaler_columns);
        debug!(
            "Feature schema: {} scaler columns, {} model columns",
            scaler_columns.len(),
            model_columns.len()
        );

        Ok(Self {
            scaler_columns: scaler_columns.into(),
            model_columns,
            positions,
            projection,
            categories,
        })
    }

    /// Columns the scaler was fit on, in order
    pub fn scaler_columns(&self) -> &[String] {
        &self.scaler_columns
    }

    pub(crate) fn shared_scaler_columns(&self) -> Arc<[String]> {
        Arc::clone(&self.scaler_columns)
    }

    /// Columns the regressor was trained on, in order
    pub fn model_columns(&self) -> &[String] {
        &self.model_columns
    }

    pub fn scaler_width(&self) -> usize {
        self.scaler_columns.len()
    }

    pub fn model_width(&self) -> usize {
        self.model_columns.len()
    }

    /// Position of a column in scaler order
    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    /// For each model column, its position in scaler order
    pub fn projection(&self) -> &[usize] {
        &self.projection
    }

    pub fn categories(&self) -> &CategoricalIndex {
        &self.categories
    }
}
