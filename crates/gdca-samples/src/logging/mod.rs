//! Cloud Logging samples.

pub mod simplelog;
