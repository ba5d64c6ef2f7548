//! System test context.
//!
//! Integration tests talk to a live project. They run only when the project
//! environment is configured and skip (with a log line) otherwise.

use crate::once::RunOnceBlocking;
use gdca_gcp::config::ENV_PROJECT_ID;
use gdca_gcp::{GcpClient, GcpClientConfig, GcpResult};
use tracing_subscriber::EnvFilter;

/// Opt-in for slow end-to-end tests (clusters, Spanner databases).
pub const ENV_E2E: &str = "GDCA_SAMPLES_E2E";
pub const ENV_KMS_KEYRING: &str = "GDCA_SAMPLES_KMS_KEYRING";
pub const ENV_KMS_CRYPTOKEY: &str = "GDCA_SAMPLES_KMS_CRYPTOKEY";
/// Spanner instance, `projects/P/instances/I`.
pub const ENV_SPANNER: &str = "GDCA_SAMPLES_SPANNER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestContext {
    pub project_id: String,
}

impl TestContext {
    /// Context for a system test, or `None` when no project is configured.
    pub fn system() -> Option<Self> {
        init_logging();
        Self::from_lookup(lookup_env, false)
    }

    /// Like [`TestContext::system`] but also requires `GDCA_SAMPLES_E2E`.
    pub fn end_to_end() -> Option<Self> {
        init_logging();
        Self::from_lookup(lookup_env, true)
    }

    fn from_lookup<F>(lookup: F, end_to_end: bool) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if end_to_end && lookup(ENV_E2E).is_none() {
            log::info!("skipping end-to-end test: {} is not set", ENV_E2E);
            return None;
        }
        match lookup(ENV_PROJECT_ID) {
            Some(project_id) => Some(Self { project_id }),
            None => {
                log::info!("skipping system test: {} is not set", ENV_PROJECT_ID);
                None
            }
        }
    }

    /// A client configured from the environment, pinned to this project.
    pub fn client(&self) -> GcpResult<GcpClient> {
        let mut config = GcpClientConfig::from_env()?;
        config.project_id = self.project_id.clone();
        GcpClient::new(config)
    }

    /// An optional, non-empty environment variable.
    pub fn env(name: &str) -> Option<String> {
        lookup_env(name)
    }
}

fn lookup_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

static LOGGING: RunOnceBlocking<()> = RunOnceBlocking::new();

/// Install the test logger (honours `RUST_LOG`). Safe to call repeatedly.
pub fn init_logging() {
    LOGGING.run(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn system_context_needs_project() {
        assert_eq!(TestContext::from_lookup(lookup(&[]), false), None);
        let tc = TestContext::from_lookup(lookup(&[(ENV_PROJECT_ID, "p")]), false).unwrap();
        assert_eq!(tc.project_id, "p");
    }

    #[test]
    fn end_to_end_needs_opt_in() {
        assert_eq!(
            TestContext::from_lookup(lookup(&[(ENV_PROJECT_ID, "p")]), true),
            None
        );
        assert!(
            TestContext::from_lookup(lookup(&[(ENV_PROJECT_ID, "p"), (ENV_E2E, "1")]), true)
                .is_some()
        );
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging();
        init_logging();
        assert!(LOGGING.has_run());
    }
}
