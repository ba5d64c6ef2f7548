//! Google Cloud Storage client.
//!
//! Covers buckets, objects, IAM policies, object ACLs, customer-supplied
//! encryption keys (CSEK) and Cloud KMS keys.
//!
//! API base: `https://storage.googleapis.com/storage/v1`
//! Media upload: `https://storage.googleapis.com/upload/storage/v1`

use crate::client::{encode_segment, GcpClient};
use crate::error::{GcpError, GcpResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

const SERVICE: &str = "storage";
const V1: &str = "/storage/v1";
const UPLOAD_V1: &str = "/upload/storage/v1";

// ── Types ───────────────────────────────────────────────────────────────

/// Cloud Storage bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metageneration: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioning: Option<Versioning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_configuration: Option<IamConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing: Option<Billing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<BucketEncryption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_event_based_hold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

impl Bucket {
    pub fn versioning_enabled(&self) -> bool {
        self.versioning.as_ref().map(|v| v.enabled).unwrap_or(false)
    }

    pub fn uniform_bucket_level_access(&self) -> Option<&UniformBucketLevelAccess> {
        self.iam_configuration
            .as_ref()
            .and_then(|c| c.uniform_bucket_level_access.as_ref())
    }

    pub fn requester_pays(&self) -> bool {
        self.billing.as_ref().map(|b| b.requester_pays).unwrap_or(false)
    }

    pub fn default_kms_key_name(&self) -> Option<&str> {
        self.encryption
            .as_ref()
            .and_then(|e| e.default_kms_key_name.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Versioning {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniform_bucket_level_access: Option<UniformBucketLevelAccess>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniformBucketLevelAccess {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Billing {
    #[serde(default)]
    pub requester_pays: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketEncryption {
    #[serde(default)]
    pub default_kms_key_name: Option<String>,
}

/// Cloud Storage object metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub generation: String,
    #[serde(default)]
    pub metageneration: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_encoding: Option<String>,
    #[serde(default)]
    pub content_disposition: Option<String>,
    #[serde(default)]
    pub content_language: Option<String>,
    #[serde(default)]
    pub cache_control: Option<String>,
    #[serde(default)]
    pub storage_class: String,
    #[serde(default)]
    pub time_created: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub time_deleted: Option<String>,
    #[serde(default)]
    pub md5_hash: Option<String>,
    #[serde(default)]
    pub crc32c: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub media_link: Option<String>,
    #[serde(default)]
    pub kms_key_name: Option<String>,
    #[serde(default)]
    pub customer_encryption: Option<CustomerEncryption>,
    #[serde(default)]
    pub event_based_hold: Option<bool>,
    #[serde(default)]
    pub temporary_hold: Option<bool>,
    #[serde(default)]
    pub retention_expiration_time: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Object {
    /// Generation as a number; 0 when absent or malformed.
    pub fn generation_number(&self) -> i64 {
        self.generation.parse().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerEncryption {
    #[serde(default)]
    pub encryption_algorithm: String,
    #[serde(default)]
    pub key_sha256: String,
}

/// Object ACL entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectAccessControl {
    #[serde(default)]
    pub entity: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// ACL entity matching every authenticated Google account.
pub const ALL_AUTHENTICATED_USERS: &str = "allAuthenticatedUsers";
/// ACL entity matching anyone on the internet.
pub const ALL_USERS: &str = "allUsers";
pub const ROLE_READER: &str = "READER";
pub const ROLE_OWNER: &str = "OWNER";

// ── IAM ─────────────────────────────────────────────────────────────────

/// IAM condition expression (CEL).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub expression: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expr>,
}

/// Bucket IAM policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etag: String,
}

impl Policy {
    /// Members granted `role` without a condition.
    pub fn members(&self, role: &str) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|b| b.role == role && b.condition.is_none())
            .flat_map(|b| b.members.iter().map(String::as_str))
            .collect()
    }

    /// Grant `role` to `member` unconditionally. Returns false if already granted.
    pub fn add_member(&mut self, role: &str, member: &str) -> bool {
        if let Some(binding) = self
            .bindings
            .iter_mut()
            .find(|b| b.role == role && b.condition.is_none())
        {
            if binding.members.iter().any(|m| m == member) {
                return false;
            }
            binding.members.push(member.to_string());
            return true;
        }
        self.bindings.push(Binding {
            role: role.to_string(),
            members: vec![member.to_string()],
            condition: None,
        });
        true
    }

    /// Revoke an unconditional grant. Empty bindings are dropped.
    pub fn remove_member(&mut self, role: &str, member: &str) -> bool {
        let mut removed = false;
        for binding in self
            .bindings
            .iter_mut()
            .filter(|b| b.role == role && b.condition.is_none())
        {
            let before = binding.members.len();
            binding.members.retain(|m| m != member);
            removed |= binding.members.len() != before;
        }
        self.bindings.retain(|b| !b.members.is_empty());
        removed
    }

    /// Add a conditional binding. Conditions require policy version 3.
    pub fn add_conditional_binding(&mut self, role: &str, member: &str, condition: Expr) {
        self.version = 3;
        self.bindings.push(Binding {
            role: role.to_string(),
            members: vec![member.to_string()],
            condition: Some(condition),
        });
    }

    /// Remove every binding of `role` carrying exactly `condition`.
    pub fn remove_conditional_binding(&mut self, role: &str, condition: &Expr) -> bool {
        let before = self.bindings.len();
        self.bindings
            .retain(|b| !(b.role == role && b.condition.as_ref() == Some(condition)));
        self.bindings.len() != before
    }
}

// ── Customer-supplied encryption keys ───────────────────────────────────

/// An AES-256 customer-supplied encryption key.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; 32]);

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncryptionKey(sha256={})", self.sha256_base64())
    }
}

impl EncryptionKey {
    /// Generate a random key.
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self(key)
    }

    /// Use 32 raw bytes as a key.
    pub fn from_bytes(bytes: &[u8]) -> GcpResult<Self> {
        let key: [u8; 32] = bytes.try_into().map_err(|_| {
            GcpError::config(&format!(
                "encryption key must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    pub fn from_base64(encoded: &str) -> GcpResult<Self> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| GcpError::config(&format!("invalid base64 key: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Base64 SHA-256 of the raw key, as Cloud Storage expects it.
    pub fn sha256_base64(&self) -> String {
        BASE64.encode(Sha256::digest(self.0))
    }

    /// Headers addressing the object being read or written.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("x-goog-encryption-algorithm", "AES256".to_string()),
            ("x-goog-encryption-key", self.to_base64()),
            ("x-goog-encryption-key-sha256", self.sha256_base64()),
        ]
    }

    /// Headers addressing the source object of a rewrite.
    pub fn copy_source_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("x-goog-copy-source-encryption-algorithm", "AES256".to_string()),
            ("x-goog-copy-source-encryption-key", self.to_base64()),
            (
                "x-goog-copy-source-encryption-key-sha256",
                self.sha256_base64(),
            ),
        ]
    }
}

// ── Request options ─────────────────────────────────────────────────────

/// Filters for listing objects.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsOptions {
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    /// Include noncurrent versions.
    pub versions: bool,
}

/// Objects plus the "directories" synthesized by a delimiter.
#[derive(Debug, Clone, Default)]
pub struct ObjectListing {
    pub objects: Vec<Object>,
    pub prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub content_type: Option<String>,
    pub encryption_key: Option<EncryptionKey>,
    pub kms_key_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RewriteOptions {
    pub source_generation: Option<i64>,
    pub source_key: Option<EncryptionKey>,
    pub destination_key: Option<EncryptionKey>,
    pub destination_kms_key_name: Option<String>,
}

// ── List wrappers ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketList {
    #[serde(default)]
    items: Vec<Bucket>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<Object>,
    #[serde(default)]
    prefixes: Vec<String>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RewriteResponse {
    #[serde(default)]
    done: bool,
    #[serde(default)]
    rewrite_token: Option<String>,
    #[serde(default)]
    resource: Option<Object>,
}

fn object_path(bucket: &str, object: &str) -> String {
    format!("{}/b/{}/o/{}", V1, bucket, encode_segment(object))
}

// ── Storage Client ──────────────────────────────────────────────────────

pub struct StorageClient;

impl StorageClient {
    // ── Buckets ─────────────────────────────────────────────────────

    /// List every bucket in a project.
    pub async fn list_buckets(client: &mut GcpClient, project: &str) -> GcpResult<Vec<Bucket>> {
        let path = format!("{}/b", V1);
        client
            .get_all_pages(
                SERVICE,
                &path,
                &[("project", project.to_string())],
                |page: BucketList| (page.items, page.next_page_token),
            )
            .await
    }

    /// Get a bucket by name.
    pub async fn get_bucket(client: &mut GcpClient, bucket_name: &str) -> GcpResult<Bucket> {
        let path = format!("{}/b/{}", V1, bucket_name);
        client.get(SERVICE, &path, &[]).await
    }

    /// Create a bucket. `bucket.name` is required.
    pub async fn create_bucket(
        client: &mut GcpClient,
        project: &str,
        bucket: &Bucket,
    ) -> GcpResult<Bucket> {
        if bucket.name.is_empty() {
            return Err(GcpError::config("bucket name is required"));
        }
        let path = format!("{}/b", V1);
        client
            .post_with(SERVICE, &path, &[("project", project)], &[], bucket)
            .await
    }

    /// Delete a bucket (must be empty).
    pub async fn delete_bucket(client: &mut GcpClient, bucket_name: &str) -> GcpResult<()> {
        let path = format!("{}/b/{}", V1, bucket_name);
        client.delete(SERVICE, &path, &[]).await?;
        Ok(())
    }

    /// Patch bucket attributes. Only the fields present in `patch` change.
    pub async fn patch_bucket(
        client: &mut GcpClient,
        bucket_name: &str,
        patch: &serde_json::Value,
    ) -> GcpResult<Bucket> {
        let path = format!("{}/b/{}", V1, bucket_name);
        client.patch(SERVICE, &path, patch, &[]).await
    }

    /// Get the bucket IAM policy (version 3, so conditions are visible).
    pub async fn get_iam_policy(client: &mut GcpClient, bucket_name: &str) -> GcpResult<Policy> {
        let path = format!("{}/b/{}/iam", V1, bucket_name);
        client
            .get(SERVICE, &path, &[("optionsRequestedPolicyVersion", "3")])
            .await
    }

    /// Replace the bucket IAM policy.
    pub async fn set_iam_policy(
        client: &mut GcpClient,
        bucket_name: &str,
        policy: &Policy,
    ) -> GcpResult<Policy> {
        let path = format!("{}/b/{}/iam", V1, bucket_name);
        client.put(SERVICE, &path, policy).await
    }

    // ── Objects ─────────────────────────────────────────────────────

    /// List objects in a bucket (all pages).
    pub async fn list_objects(
        client: &mut GcpClient,
        bucket_name: &str,
        options: &ListObjectsOptions,
    ) -> GcpResult<ObjectListing> {
        let path = format!("{}/b/{}/o", V1, bucket_name);
        let mut listing = ObjectListing::default();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some(ref p) = options.prefix {
                query.push(("prefix", p));
            }
            if let Some(ref d) = options.delimiter {
                query.push(("delimiter", d));
            }
            if options.versions {
                query.push(("versions", "true"));
            }
            if let Some(ref t) = page_token {
                query.push(("pageToken", t));
            }

            let page: ObjectList = client.get(SERVICE, &path, &query).await?;
            listing.objects.extend(page.items);
            listing.prefixes.extend(page.prefixes);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(listing)
    }

    /// Get object metadata, optionally of a specific generation.
    pub async fn get_object(
        client: &mut GcpClient,
        bucket_name: &str,
        object_name: &str,
        generation: Option<i64>,
    ) -> GcpResult<Object> {
        let path = object_path(bucket_name, object_name);
        let generation = generation.map(|g| g.to_string());
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(ref g) = generation {
            query.push(("generation", g));
        }
        client.get(SERVICE, &path, &query).await
    }

    /// Download object content.
    pub async fn download_object(
        client: &mut GcpClient,
        bucket_name: &str,
        object_name: &str,
        key: Option<&EncryptionKey>,
    ) -> GcpResult<Bytes> {
        let path = object_path(bucket_name, object_name);
        let headers = key.map(EncryptionKey::headers).unwrap_or_default();
        client
            .get_bytes(SERVICE, &path, &[("alt", "media")], &headers)
            .await
    }

    /// Upload object content in a single request.
    pub async fn upload_object(
        client: &mut GcpClient,
        bucket_name: &str,
        object_name: &str,
        data: Bytes,
        options: &UploadOptions,
    ) -> GcpResult<Object> {
        let path = format!("{}/b/{}/o", UPLOAD_V1, bucket_name);
        let mut query: Vec<(&str, &str)> = vec![("uploadType", "media"), ("name", object_name)];
        if let Some(ref kms) = options.kms_key_name {
            query.push(("kmsKeyName", kms));
        }
        let headers = options
            .encryption_key
            .as_ref()
            .map(EncryptionKey::headers)
            .unwrap_or_default();
        let content_type = options
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");
        client
            .upload_media(SERVICE, &path, &query, &headers, data, content_type)
            .await
    }

    /// Delete an object, or one generation of it.
    pub async fn delete_object(
        client: &mut GcpClient,
        bucket_name: &str,
        object_name: &str,
        generation: Option<i64>,
    ) -> GcpResult<()> {
        let path = object_path(bucket_name, object_name);
        let generation = generation.map(|g| g.to_string());
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(ref g) = generation {
            query.push(("generation", g));
        }
        client.delete(SERVICE, &path, &query).await?;
        Ok(())
    }

    /// Server-side copy, optionally from a specific source generation.
    pub async fn copy_object(
        client: &mut GcpClient,
        source_bucket: &str,
        source_object: &str,
        dest_bucket: &str,
        dest_object: &str,
        source_generation: Option<i64>,
    ) -> GcpResult<Object> {
        let path = format!(
            "{}/copyTo/b/{}/o/{}",
            object_path(source_bucket, source_object),
            dest_bucket,
            encode_segment(dest_object)
        );
        let generation = source_generation.map(|g| g.to_string());
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(ref g) = generation {
            query.push(("sourceGeneration", g));
        }
        client
            .post_with(SERVICE, &path, &query, &[], &serde_json::json!({}))
            .await
    }

    /// Rewrite an object, following rewrite tokens until done.
    ///
    /// Unlike copy, rewrite can change the encryption key of the data.
    pub async fn rewrite_object(
        client: &mut GcpClient,
        source_bucket: &str,
        source_object: &str,
        dest_bucket: &str,
        dest_object: &str,
        options: &RewriteOptions,
    ) -> GcpResult<Object> {
        let path = format!(
            "{}/rewriteTo/b/{}/o/{}",
            object_path(source_bucket, source_object),
            dest_bucket,
            encode_segment(dest_object)
        );

        let mut headers = Vec::new();
        if let Some(ref key) = options.source_key {
            headers.extend(key.copy_source_headers());
        }
        if let Some(ref key) = options.destination_key {
            headers.extend(key.headers());
        }
        let generation = options.source_generation.map(|g| g.to_string());

        let mut token: Option<String> = None;
        loop {
            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some(ref g) = generation {
                query.push(("sourceGeneration", g));
            }
            if let Some(ref kms) = options.destination_kms_key_name {
                query.push(("destinationKmsKeyName", kms));
            }
            if let Some(ref t) = token {
                query.push(("rewriteToken", t));
            }

            let resp: RewriteResponse = client
                .post_with(SERVICE, &path, &query, &headers, &serde_json::json!({}))
                .await?;
            if resp.done {
                return resp
                    .resource
                    .ok_or_else(|| GcpError::decode(SERVICE, "rewrite finished without resource"));
            }
            match resp.rewrite_token {
                Some(t) => {
                    log::debug!("rewrite of {} continuing", source_object);
                    token = Some(t);
                }
                None => {
                    return Err(GcpError::decode(
                        SERVICE,
                        "rewrite not done and no rewrite token returned",
                    ))
                }
            }
        }
    }

    /// Add an ACL entry to an object.
    pub async fn insert_object_acl(
        client: &mut GcpClient,
        bucket_name: &str,
        object_name: &str,
        entity: &str,
        role: &str,
    ) -> GcpResult<ObjectAccessControl> {
        let path = format!("{}/acl", object_path(bucket_name, object_name));
        let body = ObjectAccessControl {
            entity: entity.to_string(),
            role: role.to_string(),
            email: None,
        };
        client.post(SERVICE, &path, &body).await
    }
}
