//! Uploading, listing, copying and encrypting Cloud Storage objects.

use bytes::Bytes;
use gdca_gcp::storage::{
    EncryptionKey, ListObjectsOptions, Object, RewriteOptions, StorageClient, UploadOptions,
};
use gdca_gcp::{GcpClient, GcpError, GcpResult};
use serde_json::json;
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Deadline for bucket updates made by the versioning samples.
pub const UPDATE_DEADLINE: Duration = Duration::from_secs(10);

/// Run `call` under `deadline`; an elapsed deadline is a DEADLINE_EXCEEDED error.
async fn with_deadline<T, F>(deadline: Duration, call: F) -> GcpResult<T>
where
    F: Future<Output = GcpResult<T>>,
{
    tokio::time::timeout(deadline, call)
        .await
        .unwrap_or_else(|_| Err(GcpError::deadline_exceeded("storage")))
}

/// Upload a local file as `object`.
pub async fn upload_file(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket: &str,
    object: &str,
    path: &Path,
) -> GcpResult<Object> {
    let data = tokio::fs::read(path).await?;
    let uploaded = StorageClient::upload_object(
        client,
        bucket,
        object,
        Bytes::from(data),
        &UploadOptions::default(),
    )
    .await
    .map_err(|e| e.with_method(&format!("Object({:?}).NewWriter", object)))?;
    writeln!(w, "Blob {} uploaded.", object)?;
    Ok(uploaded)
}

pub async fn list_files(client: &mut GcpClient, w: &mut impl Write, bucket: &str) -> GcpResult<()> {
    let listing = StorageClient::list_objects(client, bucket, &ListObjectsOptions::default())
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).Objects", bucket)))?;
    for object in &listing.objects {
        writeln!(w, "{}", object.name)?;
    }
    Ok(())
}

/// List objects under `prefix`. With a delimiter (usually `/`) only the
/// direct children are listed.
pub async fn list_files_with_prefix(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket: &str,
    prefix: &str,
    delimiter: &str,
) -> GcpResult<()> {
    let options = ListObjectsOptions {
        prefix: Some(prefix.to_string()),
        delimiter: (!delimiter.is_empty()).then(|| delimiter.to_string()),
        versions: false,
    };
    let listing = StorageClient::list_objects(client, bucket, &options)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).Objects", bucket)))?;
    for object in &listing.objects {
        writeln!(w, "{}", object.name)?;
    }
    Ok(())
}

/// One line per object version: `name generation`.
pub async fn list_files_all_versions(client: &mut GcpClient, w: &mut impl Write, bucket: &str) -> GcpResult<()> {
    let options = ListObjectsOptions {
        versions: true,
        ..Default::default()
    };
    let listing = StorageClient::list_objects(client, bucket, &options)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).Objects", bucket)))?;
    for object in &listing.objects {
        writeln!(w, "{} {}", object.name, object.generation)?;
    }
    Ok(())
}

pub async fn download_file(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket: &str,
    object: &str,
) -> GcpResult<Bytes> {
    let data = StorageClient::download_object(client, bucket, object, None)
        .await
        .map_err(|e| e.with_method(&format!("Object({:?}).NewReader", object)))?;
    writeln!(w, "Blob {} downloaded.", object)?;
    Ok(data)
}

pub async fn get_metadata(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket: &str,
    object: &str,
) -> GcpResult<Object> {
    let attrs = StorageClient::get_object(client, bucket, object, None)
        .await
        .map_err(|e| e.with_method(&format!("Object({:?}).Attrs", object)))?;
    writeln!(w, "Bucket: {}", attrs.bucket)?;
    writeln!(w, "CacheControl: {}", attrs.cache_control.as_deref().unwrap_or(""))?;
    writeln!(w, "ContentDisposition: {}", attrs.content_disposition.as_deref().unwrap_or(""))?;
    writeln!(w, "ContentEncoding: {}", attrs.content_encoding.as_deref().unwrap_or(""))?;
    writeln!(w, "ContentLanguage: {}", attrs.content_language.as_deref().unwrap_or(""))?;
    writeln!(w, "ContentType: {}", attrs.content_type.as_deref().unwrap_or(""))?;
    writeln!(w, "Crc32c: {}", attrs.crc32c.as_deref().unwrap_or(""))?;
    writeln!(w, "Generation: {}", attrs.generation)?;
    writeln!(w, "KmsKeyName: {}", attrs.kms_key_name.as_deref().unwrap_or(""))?;
    writeln!(w, "Md5Hash: {}", attrs.md5_hash.as_deref().unwrap_or(""))?;
    writeln!(w, "MediaLink: {}", attrs.media_link.as_deref().unwrap_or(""))?;
    writeln!(w, "Metageneration: {}", attrs.metageneration)?;
    writeln!(w, "Name: {}", attrs.name)?;
    writeln!(w, "Size: {}", attrs.size)?;
    writeln!(w, "StorageClass: {}", attrs.storage_class)?;
    writeln!(w, "TimeCreated: {}", attrs.time_created)?;
    writeln!(w, "Updated: {}", attrs.updated)?;
    writeln!(w, "Event-based hold enabled? {}", attrs.event_based_hold.unwrap_or(false))?;
    writeln!(w, "Temporary hold enabled? {}", attrs.temporary_hold.unwrap_or(false))?;
    writeln!(
        w,
        "Retention expiration time: {}",
        attrs.retention_expiration_time.as_deref().unwrap_or("")
    )?;
    let mut metadata: Vec<_> = attrs.metadata.iter().collect();
    metadata.sort();
    for (key, value) in metadata {
        writeln!(w, "\t{} = {}", key, value)?;
    }
    Ok(attrs)
}

/// Grant `role` on `object` to `entity` (e.g. `allAuthenticatedUsers`, `READER`).
pub async fn make_public(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket: &str,
    object: &str,
    entity: &str,
    role: &str,
) -> GcpResult<()> {
    StorageClient::insert_object_acl(client, bucket, object, entity, role)
        .await
        .map_err(|e| e.with_method(&format!("Object({:?}).ACL().Set", object)))?;
    writeln!(w, "Blob {} is publicly accessible.", object)?;
    Ok(())
}

/// Rename `object` to `{object}-rename` (copy, then delete the source).
pub async fn move_file(client: &mut GcpClient, w: &mut impl Write, bucket: &str, object: &str) -> GcpResult<String> {
    let dst = format!("{}-rename", object);
    StorageClient::copy_object(client, bucket, object, bucket, &dst, None)
        .await
        .map_err(|e| e.with_method(&format!("Object({:?}).CopierFrom", dst)))?;
    StorageClient::delete_object(client, bucket, object, None)
        .await
        .map_err(|e| e.with_method(&format!("Object({:?}).Delete", object)))?;
    writeln!(w, "Blob {} moved to {}.", object, dst)?;
    Ok(dst)
}

/// Copy `object` from `src_bucket` into `dst_bucket` as `{object}-copy`.
pub async fn copy_file(
    client: &mut GcpClient,
    w: &mut impl Write,
    dst_bucket: &str,
    src_bucket: &str,
    object: &str,
) -> GcpResult<String> {
    let dst = format!("{}-copy", object);
    StorageClient::copy_object(client, src_bucket, object, dst_bucket, &dst, None)
        .await
        .map_err(|e| e.with_method(&format!("Object({:?}).CopierFrom", dst)))?;
    writeln!(
        w,
        "Blob {} in bucket {} copied to blob {} in bucket {}.",
        object, src_bucket, dst, dst_bucket
    )?;
    Ok(dst)
}

/// Copy a noncurrent generation of `src_object` to `dst_object`.
pub async fn copy_old_version_of_object(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket: &str,
    src_object: &str,
    dst_object: &str,
    generation: i64,
) -> GcpResult<()> {
    StorageClient::copy_object(client, bucket, src_object, bucket, dst_object, Some(generation))
        .await
        .map_err(|e| e.with_method(&format!("Object({:?}).CopierFrom", dst_object)))?;
    writeln!(
        w,
        "Generation {} of object {} in bucket {} was copied to {}",
        generation, src_object, bucket, dst_object
    )?;
    Ok(())
}

pub async fn delete_file(client: &mut GcpClient, w: &mut impl Write, bucket: &str, object: &str) -> GcpResult<()> {
    StorageClient::delete_object(client, bucket, object, None)
        .await
        .map_err(|e| e.with_method(&format!("Object({:?}).Delete", object)))?;
    writeln!(w, "Blob {} deleted.", object)?;
    Ok(())
}

// ── Versioning ──────────────────────────────────────────────────────

pub async fn enable_versioning(client: &mut GcpClient, w: &mut impl Write, bucket: &str) -> GcpResult<()> {
    let patch = json!({ "versioning": { "enabled": true } });
    StorageClient::patch_bucket(client, bucket, &patch)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).Update", bucket)))?;
    writeln!(w, "Versioning was enabled for {}", bucket)?;
    Ok(())
}

/// Disable versioning, giving the update [`UPDATE_DEADLINE`] to complete.
pub async fn disable_versioning(client: &mut GcpClient, w: &mut impl Write, bucket: &str) -> GcpResult<()> {
    let patch = json!({ "versioning": { "enabled": false } });
    with_deadline(UPDATE_DEADLINE, StorageClient::patch_bucket(client, bucket, &patch))
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).Update", bucket)))?;
    writeln!(w, "Versioning was disabled for {}", bucket)?;
    Ok(())
}

// ── Encryption ──────────────────────────────────────────────────────

/// Generate a random AES-256 key suitable for customer-supplied encryption.
pub fn generate_encryption_key(w: &mut impl Write) -> GcpResult<EncryptionKey> {
    let key = EncryptionKey::generate();
    writeln!(w, "Encryption key: {}", key.to_base64())?;
    Ok(key)
}

/// Upload `object` encrypted with a customer-supplied key.
pub async fn upload_encrypted_file(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket: &str,
    object: &str,
    key: &EncryptionKey,
) -> GcpResult<()> {
    let options = UploadOptions {
        content_type: Some("text/plain".to_string()),
        encryption_key: Some(key.clone()),
        kms_key_name: None,
    };
    StorageClient::upload_object(client, bucket, object, Bytes::from_static(b"top secret"), &options)
        .await
        .map_err(|e| e.with_method(&format!("Object({:?}).Key(secretKey).NewWriter", object)))?;
    writeln!(w, "Uploaded encrypted object {}.", object)?;
    Ok(())
}

/// Re-encrypt `object` from `key` to `new_key` in place.
pub async fn rotate_encryption_key(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket: &str,
    object: &str,
    key: &EncryptionKey,
    new_key: &EncryptionKey,
) -> GcpResult<()> {
    let options = RewriteOptions {
        source_key: Some(key.clone()),
        destination_key: Some(new_key.clone()),
        ..Default::default()
    };
    StorageClient::rewrite_object(client, bucket, object, bucket, object, &options)
        .await
        .map_err(|e| e.with_method(&format!("Object({:?}).Key(newKey).CopierFrom", object)))?;
    writeln!(w, "Key rotation complete for blob {}.", object)?;
    Ok(())
}

/// Upload `object` encrypted with a Cloud KMS key.
pub async fn upload_with_kms_key(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket: &str,
    object: &str,
    kms_key_name: &str,
) -> GcpResult<()> {
    let options = UploadOptions {
        content_type: Some("text/plain".to_string()),
        encryption_key: None,
        kms_key_name: Some(kms_key_name.to_string()),
    };
    StorageClient::upload_object(client, bucket, object, Bytes::from_static(b"top secret"), &options)
        .await
        .map_err(|e| e.with_method(&format!("Object({:?}).NewWriter", object)))?;
    writeln!(w, "Uploaded {} with KMS key {}.", object, kms_key_name)?;
    Ok(())
}
