//! Data Validation at the Input Boundary
//!
//! Neighbourhood bounding boxes and the range limits the input form
//! enforces before a record reaches the feature pipeline.

mod error;
mod geo;
mod validator;

pub use error::ValidationError;
pub use geo::{GeoBounds, GeoIndex, BOUNDS_EPSILON, COORDINATE_STEP};
pub use validator::{RecordLimits, ValidationResult, Validator};
