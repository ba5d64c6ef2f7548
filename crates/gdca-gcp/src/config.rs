//! Client configuration and credential loading.
//!
//! Credentials come either from a service account key file (the JSON
//! downloaded from the Cloud Console) or from a pre-issued access token.
//! When a client certificate is configured the client talks to the
//! `*.mtls.googleapis.com` endpoints.

use crate::error::{GcpError, GcpResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project the samples run against.
pub const ENV_PROJECT_ID: &str = "GDCA_SAMPLES_PROJECT_ID";
/// Path of a service account key JSON file.
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Pre-issued OAuth2 access token; takes precedence over the key file.
pub const ENV_ACCESS_TOKEN: &str = "GDCA_ACCESS_TOKEN";
/// PEM file holding the client certificate and its private key.
pub const ENV_CLIENT_CERTIFICATE: &str = "GDCA_CLIENT_CERTIFICATE";
/// Base URL used for every service instead of the Google endpoints.
pub const ENV_ENDPOINT_OVERRIDE: &str = "GDCA_ENDPOINT_OVERRIDE";

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

// ── Service Account Key ─────────────────────────────────────────────────

/// Parsed service account key JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    pub r#type: String,
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    /// Parse a service account key from a JSON string.
    pub fn from_json(json: &str) -> GcpResult<Self> {
        let key: Self = serde_json::from_str(json).map_err(|e| {
            GcpError::config(&format!("Invalid service account key JSON: {}", e))
        })?;
        key.validate()?;
        Ok(key)
    }

    /// Read and parse a service account key file.
    pub fn from_file(path: &Path) -> GcpResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            GcpError::config(&format!("Cannot read key file {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Validate the key has required fields.
    pub fn validate(&self) -> GcpResult<()> {
        if self.r#type != "service_account" {
            return Err(GcpError::config(&format!(
                "Expected type 'service_account', got '{}'",
                self.r#type
            )));
        }
        for (field, value) in [
            ("private_key", &self.private_key),
            ("client_email", &self.client_email),
            ("token_uri", &self.token_uri),
        ] {
            if value.is_empty() {
                return Err(GcpError::config(&format!("{} is empty", field)));
            }
        }
        Ok(())
    }
}

// ── Credentials ─────────────────────────────────────────────────────────

/// How the client obtains bearer tokens.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// JWT → access token exchange with a service account key.
    ServiceAccount(ServiceAccountKey),
    /// A token issued elsewhere (e.g. `gcloud auth print-access-token`).
    AccessToken(String),
}

// ── Client Config ───────────────────────────────────────────────────────

/// Configuration for a [`crate::client::GcpClient`].
#[derive(Debug, Clone)]
pub struct GcpClientConfig {
    /// Project used when a call does not name one explicitly.
    pub project_id: String,
    pub credentials: Credentials,
    /// OAuth2 scopes to request.
    pub scopes: Vec<String>,
    /// PEM bundle (certificate + key) presented to mTLS endpoints.
    pub client_certificate: Option<PathBuf>,
    /// Base URL replacing every `https://{service}.googleapis.com`.
    pub endpoint_override: Option<String>,
    /// Whole-request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl GcpClientConfig {
    pub fn new(project_id: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            project_id: project_id.into(),
            credentials,
            scopes: vec![CLOUD_PLATFORM_SCOPE.to_string()],
            client_certificate: None,
            endpoint_override: None,
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_endpoint_override(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into());
        self
    }

    pub fn with_client_certificate(mut self, pem: impl Into<PathBuf>) -> Self {
        self.client_certificate = Some(pem.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the configuration from the process environment.
    pub fn from_env() -> GcpResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> GcpResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
            Credentials::AccessToken(token)
        } else if let Some(path) = lookup(ENV_CREDENTIALS) {
            Credentials::ServiceAccount(ServiceAccountKey::from_file(Path::new(&path))?)
        } else {
            return Err(GcpError::config(&format!(
                "No credentials: set {} or {}",
                ENV_ACCESS_TOKEN, ENV_CREDENTIALS
            )));
        };

        let project_id = match (lookup(ENV_PROJECT_ID), &credentials) {
            (Some(project), _) => project,
            (None, Credentials::ServiceAccount(key)) => key.project_id.clone(),
            (None, Credentials::AccessToken(_)) => {
                return Err(GcpError::config(&format!("{} is not set", ENV_PROJECT_ID)))
            }
        };

        let mut config = Self::new(project_id, credentials);
        if let Some(pem) = lookup(ENV_CLIENT_CERTIFICATE) {
            config = config.with_client_certificate(pem);
        }
        if let Some(endpoint) = lookup(ENV_ENDPOINT_OVERRIDE) {
            config = config.with_endpoint_override(endpoint);
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> GcpResult<()> {
        if self.project_id.is_empty() {
            return Err(GcpError::config("project_id is required"));
        }
        if self.scopes.is_empty() {
            return Err(GcpError::config("at least one OAuth2 scope is required"));
        }
        if let Some(ref endpoint) = self.endpoint_override {
            url::Url::parse(endpoint).map_err(|e| {
                GcpError::config(&format!("Invalid endpoint override '{}': {}", endpoint, e))
            })?;
        }
        Ok(())
    }
}
