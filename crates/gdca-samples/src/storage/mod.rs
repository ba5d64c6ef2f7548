//! Cloud Storage samples.

pub mod buckets;
pub mod objects;
