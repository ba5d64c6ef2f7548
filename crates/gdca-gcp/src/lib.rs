//! # gdca-gcp – Typed REST clients for the Google Cloud APIs used by the samples
//!
//! OAuth2 (service-account JWT or pre-issued token) authentication, endpoint
//! selection for device-certificate (mTLS) access, Google error parsing,
//! pagination and long-running operation polling.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  Service clients (unit structs, static fns)      │
//! │    ComputeClient · StorageClient · PubSubClient  │
//! │    KmsClient · LoggingClient · GkeClient         │
//! │    SpannerClient                                 │
//! ├──────────────────────────────────────────────────┤
//! │  GcpClient  (client.rs)                          │
//! │  ├── endpoint: override > mtls > default         │
//! │  ├── get / post / put / patch / delete / media   │
//! │  ├── get_all_pages  (pagination)                 │
//! │  └── wait_for_operation  (polling)               │
//! ├──────────────────────────────────────────────────┤
//! │  TokenManager  (auth.rs)                         │
//! │  └── JWT → access_token exchange + caching       │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## GCP Services
//!
//! | Service           | Module     | API Base                                    |
//! |-------------------|------------|---------------------------------------------|
//! | Compute Engine    | `compute`  | `https://compute.googleapis.com/compute/v1` |
//! | Cloud Storage     | `storage`  | `https://storage.googleapis.com/storage/v1` |
//! | Pub/Sub           | `pubsub`   | `https://pubsub.googleapis.com/v1`          |
//! | Cloud KMS         | `kms`      | `https://cloudkms.googleapis.com/v1`        |
//! | Cloud Logging     | `logging`  | `https://logging.googleapis.com/v2`         |
//! | GKE               | `gke`      | `https://container.googleapis.com/v1`       |
//! | Cloud Spanner     | `spanner`  | `https://spanner.googleapis.com/v1`         |
//!
//! With a client certificate configured every host becomes
//! `{service}.mtls.googleapis.com`.

// ── Sub-modules ─────────────────────────────────────────────────────────

pub mod auth;
pub mod client;
pub mod config;
pub mod error;

// Service clients
pub mod compute;
pub mod gke;
pub mod kms;
pub mod logging;
pub mod pubsub;
pub mod spanner;
pub mod storage;

// ── Re-exports ──────────────────────────────────────────────────────────

pub use client::GcpClient;
pub use config::{Credentials, GcpClientConfig, ServiceAccountKey};
pub use error::{GcpError, GcpResult};
