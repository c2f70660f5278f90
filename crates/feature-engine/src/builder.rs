//! Dense Feature Vector Assembly

use crate::record::{RawInputRecord, Selection, Superhost};
use crate::schema::{FeatureSchema, OneHotGroup, RateGroup, SUPERHOST_COLUMN};
use crate::SchemaError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Value fed to `calculated_host_listings_count` regardless of user input
// TODO: confirm with product whether this should follow host_total_listings_count
pub const CALCULATED_HOST_LISTINGS_COUNT: f64 = 1.0;

/// Room type that acts as the implicit reference level
pub const BASELINE_ROOM_TYPE: &str = "Entire home/apt";

/// Numeric passthrough fields, keyed by the column they feed
pub fn passthrough_values(raw: &RawInputRecord) -> [(&'static str, f64); 20] {
    [
        ("host_total_listings_count", f64::from(raw.host_total_listings_count)),
        ("latitude", raw.latitude),
        ("longitude", raw.longitude),
        ("accommodates", f64::from(raw.accommodates)),
        ("bedrooms", f64::from(raw.bedrooms)),
        ("beds", f64::from(raw.beds)),
        ("minimum_nights", f64::from(raw.minimum_nights)),
        ("minimum_minimum_nights", f64::from(raw.minimum_minimum_nights)),
        ("availability_30", f64::from(raw.availability_30)),
        ("availability_60", f64::from(raw.availability_60)),
        ("availability_90", f64::from(raw.availability_90)),
        ("availability_365", f64::from(raw.availability_365)),
        ("availability_eoy", f64::from(raw.availability_eoy)),
        ("calculated_host_listings_count", CALCULATED_HOST_LISTINGS_COUNT),
        ("number_of_reviews_l30d", f64::from(raw.number_of_reviews_l30d)),
        ("estimated_occupancy_l365d", raw.estimated_occupancy_l365d),
        ("estimated_revenue_l365d", raw.estimated_revenue_l365d),
        ("review_scores_rating", raw.review_scores_rating),
        ("review_scores_cleanliness", raw.review_scores_cleanliness),
        ("review_scores_location", raw.review_scores_location),
    ]
}

/// Named numeric row for one request
#[derive(Debug, Clone, PartialEq)]
pub struct DenseFeatureVector {
    columns: Arc<[String]>,
    values: Vec<f64>,
}

impl DenseFeatureVector {
    /// All scaler columns set to 0.0
    pub fn zeros(schema: &FeatureSchema) -> Self {
        Self {
            columns: schema.shared_scaler_columns(),
            values: vec![0.0; schema.scaler_width()],
        }
    }

    /// Vector with arbitrary columns, in the given order
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<f64>) =
            pairs.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named column
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    fn set(&mut self, position: usize, value: f64) {
        self.values[position] = value;
    }

    /// Values reordered into `columns`.
    ///
    /// The vector must carry exactly those columns, no more and no fewer.
    pub fn reindex(&self, columns: &[String]) -> Result<Vec<f64>, SchemaError> {
        if *self.columns == *columns {
            return Ok(self.values.clone());
        }

        let by_name: HashMap<&str, f64> = self.iter().collect();
        let wanted: HashSet<&str> = columns.iter().map(String::as_str).collect();

        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !by_name.contains_key(c.as_str()))
            .cloned()
            .collect();
        let unexpected: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !wanted.contains(c.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() || !unexpected.is_empty() || by_name.len() != self.len() {
            return Err(SchemaError::ColumnMismatch { missing, unexpected });
        }

        Ok(columns.iter().map(|c| by_name[c.as_str()]).collect())
    }
}

/// Builds dense vectors in scaler column order
#[derive(Debug, Clone)]
pub struct FeatureVectorBuilder {
    schema: Arc<FeatureSchema>,
}

impl FeatureVectorBuilder {
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Encode a raw record. Never fails: categories without a trained
    /// column fall back to the all-zero baseline of their group.
    pub fn build(&self, raw: &RawInputRecord) -> DenseFeatureVector {
        let mut vector = DenseFeatureVector::zeros(&self.schema);

        for (column, value) in passthrough_values(raw) {
            match self.schema.position(column) {
                Some(position) => vector.set(position, value),
                None => debug!("Schema has no {} column, skipping", column),
            }
        }

        let baseline = Selection::Other;
        let room_type = if raw.room_type.value() == Some(BASELINE_ROOM_TYPE) {
            &baseline
        } else {
            &raw.room_type
        };

        self.set_one_hot(&mut vector, OneHotGroup::Borough, &raw.borough);
        self.set_one_hot(&mut vector, OneHotGroup::Neighbourhood, &raw.neighbourhood);
        self.set_one_hot(&mut vector, OneHotGroup::RoomType, room_type);
        self.set_one_hot(&mut vector, OneHotGroup::PropertyType, &raw.property_type);
        self.set_one_hot(&mut vector, OneHotGroup::HostNeighbourhood, &raw.host_neighbourhood);
        self.set_one_hot(&mut vector, OneHotGroup::HostResponseTime, &raw.host_response_time);

        if raw.host_is_superhost == Superhost::Yes {
            if let Some(position) = self.schema.position(SUPERHOST_COLUMN) {
                vector.set(position, 1.0);
            }
        }

        self.set_nearest_bucket(&mut vector, RateGroup::ResponseRate, raw.host_response_rate);
        self.set_nearest_bucket(&mut vector, RateGroup::AcceptanceRate, raw.host_acceptance_rate);

        debug_assert_eq!(vector.columns(), self.schema.scaler_columns());
        vector
    }

    fn set_one_hot(&self, vector: &mut DenseFeatureVector, group: OneHotGroup, selection: &Selection) {
        let Some(value) = selection.value() else {
            return;
        };

        let column = group.column_for(value);
        match self.schema.position(&column) {
            Some(position) => vector.set(position, 1.0),
            None => debug!("No trained column {}, using {:?} baseline", column, group),
        }
    }

    fn set_nearest_bucket(&self, vector: &mut DenseFeatureVector, group: RateGroup, rate: f64) {
        if let Some(bucket) = self.schema.categories().nearest_bucket(group, rate) {
            vector.set(bucket.position, 1.0);
        }
    }
}
