//! Pub/Sub samples.

pub mod topics;
