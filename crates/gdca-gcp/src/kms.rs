//! Cloud Key Management Service client.
//!
//! Key rings, crypto keys and crypto key versions. Resources are addressed
//! by their full names (`projects/{p}/locations/{l}/keyRings/{r}/...`).
//!
//! API base: `https://cloudkms.googleapis.com/v1`

use crate::client::GcpClient;
use crate::error::GcpResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const SERVICE: &str = "cloudkms";
const V1: &str = "/v1";

/// Purpose of keys usable for asymmetric decryption.
pub const PURPOSE_ASYMMETRIC_DECRYPT: &str = "ASYMMETRIC_DECRYPT";
pub const RSA_DECRYPT_OAEP_2048_SHA256: &str = "RSA_DECRYPT_OAEP_2048_SHA256";

// ── Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRing {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKey {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_template: Option<CryptoKeyVersionTemplate>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<CryptoKeyVersion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeyVersionTemplate {
    #[serde(default)]
    pub algorithm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeyVersion {
    #[serde(default)]
    pub name: String,
    /// ENABLED, DISABLED, DESTROY_SCHEDULED, DESTROYED, ...
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub destroy_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CryptoKeyList {
    #[serde(default)]
    crypto_keys: Vec<CryptoKey>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CryptoKeyVersionList {
    #[serde(default)]
    crypto_key_versions: Vec<CryptoKeyVersion>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// `projects/{project}/locations/{location}`
pub fn location_name(project: &str, location: &str) -> String {
    format!("projects/{}/locations/{}", project, location)
}

// ── KMS Client ──────────────────────────────────────────────────────────

pub struct KmsClient;

impl KmsClient {
    /// Create a key ring under `parent` (a location name).
    pub async fn create_key_ring(
        client: &mut GcpClient,
        parent: &str,
        key_ring_id: &str,
    ) -> GcpResult<KeyRing> {
        let path = format!("{}/{}/keyRings", V1, parent);
        client
            .post_with(
                SERVICE,
                &path,
                &[("keyRingId", key_ring_id)],
                &[],
                &serde_json::json!({}),
            )
            .await
    }

    pub async fn get_key_ring(client: &mut GcpClient, name: &str) -> GcpResult<KeyRing> {
        let path = format!("{}/{}", V1, name);
        client.get(SERVICE, &path, &[]).await
    }

    /// Create a crypto key in a key ring.
    pub async fn create_crypto_key(
        client: &mut GcpClient,
        key_ring: &str,
        crypto_key_id: &str,
        key: &CryptoKey,
    ) -> GcpResult<CryptoKey> {
        let path = format!("{}/{}/cryptoKeys", V1, key_ring);
        client
            .post_with(SERVICE, &path, &[("cryptoKeyId", crypto_key_id)], &[], key)
            .await
    }

    /// List every crypto key in a key ring.
    pub async fn list_crypto_keys(client: &mut GcpClient, key_ring: &str) -> GcpResult<Vec<CryptoKey>> {
        let path = format!("{}/{}/cryptoKeys", V1, key_ring);
        client
            .get_all_pages(SERVICE, &path, &[], |page: CryptoKeyList| {
                (page.crypto_keys, page.next_page_token)
            })
            .await
    }

    /// List versions of a crypto key, optionally filtered
    /// (e.g. `state=ENABLED`).
    pub async fn list_crypto_key_versions(
        client: &mut GcpClient,
        crypto_key: &str,
        filter: Option<&str>,
    ) -> GcpResult<Vec<CryptoKeyVersion>> {
        let path = format!("{}/{}/cryptoKeyVersions", V1, crypto_key);
        let query: Vec<(&str, String)> = filter
            .map(|f| vec![("filter", f.to_string())])
            .unwrap_or_default();
        client
            .get_all_pages(SERVICE, &path, &query, |page: CryptoKeyVersionList| {
                (page.crypto_key_versions, page.next_page_token)
            })
            .await
    }

    /// Schedule a key version for destruction.
    pub async fn destroy_crypto_key_version(
        client: &mut GcpClient,
        version: &str,
    ) -> GcpResult<CryptoKeyVersion> {
        let path = format!("{}/{}:destroy", V1, version);
        client.post(SERVICE, &path, &serde_json::json!({})).await
    }
}
