//! # gdca-testutil – Test orchestration for the Google Cloud samples
//!
//! * [`retry`] – bounded, fixed-interval retry poller for eventual consistency
//! * [`once`] – run-once guard for per-process setup and cleanup
//! * [`context`] – system-test context read from the environment
//! * [`fixtures`] – live resources (clean bucket, KMS key ring)

pub mod context;
pub mod fixtures;
pub mod once;
pub mod retry;

pub use context::{init_logging, TestContext};
pub use once::{RunOnce, RunOnceBlocking};
pub use retry::{Attempt, AttemptFailed, RetryError, RetryPolicy};
