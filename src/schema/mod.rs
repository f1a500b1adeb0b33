//! gaze.sample.v1 ingestion schema
//!
//! This module defines the input record format for exported eye-tracker
//! samples and the adapter that turns records into the canonical sample table.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;
