//! Live resources shared by integration tests.

pub mod kms;
pub mod storage;

use crate::retry::RetryError;
use gdca_gcp::GcpError;

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error(transparent)]
    Gcp(#[from] GcpError),
    #[error("{what}: {source}")]
    Retry {
        what: String,
        source: RetryError<GcpError>,
    },
}

pub use kms::KmsFixture;
pub use storage::clean_bucket;
