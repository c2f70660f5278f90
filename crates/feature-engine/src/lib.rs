//! Feature Engineering Engine
//!
//! Turns a sparse record of user inputs into the dense, ordered feature
//! vector the fitted scaler and regressor were trained on.

mod builder;
mod record;
mod schema;

pub use builder::{
    passthrough_values, DenseFeatureVector, FeatureVectorBuilder, BASELINE_ROOM_TYPE,
    CALCULATED_HOST_LISTINGS_COUNT,
};
pub use record::{RawInputRecord, Selection, Superhost, OTHER};
pub use schema::{
    CategoricalIndex, FeatureSchema, GroupMember, OneHotGroup, RateBucket, RateGroup,
    SUPERHOST_COLUMN,
};

use thiserror::Error;

/// Errors raised while assembling or checking a feature schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Scaler column list is empty")]
    EmptyScalerColumns,
    #[error("Model column list is empty")]
    EmptyModelColumns,
    #[error("Duplicate scaler column: {0}")]
    DuplicateScalerColumn(String),
    #[error("Duplicate model column: {0}")]
    DuplicateModelColumn(String),
    #[error("Model column {0} is not among the scaler columns")]
    UnknownModelColumn(String),
    #[error("Vector columns differ from schema: missing {missing:?}, unexpected {unexpected:?}")]
    ColumnMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
}
