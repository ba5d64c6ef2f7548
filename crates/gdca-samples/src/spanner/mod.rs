//! Cloud Spanner samples.

pub mod leaderboard;
