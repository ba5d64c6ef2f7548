//! Compute Engine samples.

pub mod instances;
