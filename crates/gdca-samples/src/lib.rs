//! # gdca-samples – Google Cloud API samples
//!
//! Each sample takes a [`gdca_gcp::GcpClient`] and a writer, makes one API
//! call (or a short sequence of them) and writes a one-line confirmation.
//! Failures carry the name of the call that failed.
//!
//! | Area      | Module                  |
//! |-----------|-------------------------|
//! | Compute   | [`compute::instances`]  |
//! | Storage   | [`storage::buckets`], [`storage::objects`] |
//! | Pub/Sub   | [`pubsub::topics`]      |
//! | KMS       | [`kms`]                 |
//! | Logging   | [`logging::simplelog`]  |
//! | GKE       | [`container::listclusters`] |
//! | Spanner   | [`spanner::leaderboard`] |

pub mod compute;
pub mod container;
pub mod kms;
pub mod logging;
pub mod pubsub;
pub mod spanner;
pub mod storage;

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber for the sample binaries. `RUST_LOG` overrides
/// the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
