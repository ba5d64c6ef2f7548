//! GKE samples.

pub mod listclusters;
