//! HTTP Routes

pub mod locations;
pub mod options;
pub mod predictions;
