//! Creating, inspecting and configuring Cloud Storage buckets.

use gdca_gcp::storage::{Bucket, Expr, Policy, StorageClient, UniformBucketLevelAccess};
use gdca_gcp::{GcpClient, GcpResult};
use serde_json::json;
use std::io::Write;

/// Role granted by the IAM samples.
pub const SAMPLE_ROLE: &str = "roles/storage.objectViewer";
/// Member granted [`SAMPLE_ROLE`] by the IAM samples.
pub const SAMPLE_MEMBER: &str = "group:cloud-logs@google.com";

pub async fn create_bucket(
    client: &mut GcpClient,
    w: &mut impl Write,
    project_id: &str,
    bucket_name: &str,
) -> GcpResult<()> {
    let bucket = Bucket {
        name: bucket_name.to_string(),
        ..Default::default()
    };
    StorageClient::create_bucket(client, project_id, &bucket)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).Create", bucket_name)))?;
    writeln!(w, "Bucket {} created", bucket_name)?;
    Ok(())
}

/// Create a COLDLINE bucket in the ASIA multi-region.
pub async fn create_bucket_class_location(
    client: &mut GcpClient,
    w: &mut impl Write,
    project_id: &str,
    bucket_name: &str,
) -> GcpResult<()> {
    let bucket = Bucket {
        name: bucket_name.to_string(),
        storage_class: Some("COLDLINE".to_string()),
        location: Some("ASIA".to_string()),
        ..Default::default()
    };
    let created = StorageClient::create_bucket(client, project_id, &bucket)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).Create", bucket_name)))?;
    writeln!(
        w,
        "Created bucket {} in {} with storage class {}",
        created.name,
        created.location.as_deref().unwrap_or("ASIA"),
        created.storage_class.as_deref().unwrap_or("COLDLINE")
    )?;
    Ok(())
}

pub async fn delete_bucket(client: &mut GcpClient, w: &mut impl Write, bucket_name: &str) -> GcpResult<()> {
    StorageClient::delete_bucket(client, bucket_name)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).Delete", bucket_name)))?;
    writeln!(w, "Bucket {} deleted", bucket_name)?;
    Ok(())
}

/// Names of every bucket in the project, one per line.
pub async fn list_buckets(client: &mut GcpClient, w: &mut impl Write, project_id: &str) -> GcpResult<Vec<String>> {
    let buckets = StorageClient::list_buckets(client, project_id)
        .await
        .map_err(|e| e.with_method("Buckets.List"))?;
    let mut names = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        writeln!(w, "{}", bucket.name)?;
        names.push(bucket.name);
    }
    Ok(names)
}

pub async fn get_bucket_metadata(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket_name: &str,
) -> GcpResult<Bucket> {
    let bucket = StorageClient::get_bucket(client, bucket_name)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).Attrs", bucket_name)))?;
    writeln!(w, "BucketName: {}", bucket.name)?;
    writeln!(w, "DefaultEventBasedHold: {}", bucket.default_event_based_hold.unwrap_or(false))?;
    if let Some(key) = bucket.default_kms_key_name() {
        writeln!(w, "DefaultKmsKeyName: {}", key)?;
    }
    writeln!(w, "Location: {}", bucket.location.as_deref().unwrap_or(""))?;
    writeln!(w, "LocationType: {}", bucket.location_type.as_deref().unwrap_or(""))?;
    writeln!(w, "MetaGeneration: {}", bucket.metageneration.as_deref().unwrap_or(""))?;
    writeln!(w, "StorageClass: {}", bucket.storage_class.as_deref().unwrap_or(""))?;
    writeln!(w, "TimeCreated: {}", bucket.time_created.as_deref().unwrap_or(""))?;
    writeln!(w, "VersioningEnabled: {}", bucket.versioning_enabled())?;
    writeln!(w, "RequesterPays: {}", bucket.requester_pays())?;
    let mut labels: Vec<_> = bucket.labels.iter().collect();
    labels.sort();
    for (key, value) in labels {
        writeln!(w, "\t{} = {}", key, value)?;
    }
    Ok(bucket)
}

// ── IAM ─────────────────────────────────────────────────────────────

/// Write every role and its members.
pub async fn get_bucket_policy(client: &mut GcpClient, w: &mut impl Write, bucket_name: &str) -> GcpResult<Policy> {
    let policy = StorageClient::get_iam_policy(client, bucket_name)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).IAM().V3().Policy", bucket_name)))?;
    for binding in &policy.bindings {
        writeln!(w, "{:?}: {:?}", binding.role, binding.members)?;
    }
    Ok(policy)
}

async fn update_policy<F>(client: &mut GcpClient, bucket_name: &str, edit: F) -> GcpResult<Policy>
where
    F: FnOnce(&mut Policy),
{
    let mut policy = StorageClient::get_iam_policy(client, bucket_name)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).IAM().V3().Policy", bucket_name)))?;
    edit(&mut policy);
    StorageClient::set_iam_policy(client, bucket_name, &policy)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).IAM().V3().SetPolicy", bucket_name)))
}

pub async fn add_bucket_iam_member(client: &mut GcpClient, w: &mut impl Write, bucket_name: &str) -> GcpResult<()> {
    update_policy(client, bucket_name, |p| {
        p.add_member(SAMPLE_ROLE, SAMPLE_MEMBER);
    })
    .await?;
    writeln!(w, "Added {} with role {} to {}", SAMPLE_MEMBER, SAMPLE_ROLE, bucket_name)?;
    Ok(())
}

pub async fn remove_bucket_iam_member(client: &mut GcpClient, w: &mut impl Write, bucket_name: &str) -> GcpResult<()> {
    update_policy(client, bucket_name, |p| {
        p.remove_member(SAMPLE_ROLE, SAMPLE_MEMBER);
    })
    .await?;
    writeln!(w, "Removed {} with role {} from {}", SAMPLE_MEMBER, SAMPLE_ROLE, bucket_name)?;
    Ok(())
}

/// Grant `role` to `member` under a condition. Requires uniform
/// bucket-level access.
pub async fn add_bucket_conditional_iam_binding(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket_name: &str,
    role: &str,
    member: &str,
    condition: Expr,
) -> GcpResult<()> {
    let summary = format!(
        "Added {} with role {} to {} with condition {:?} {:?} {:?}",
        member, role, bucket_name, condition.title, condition.description, condition.expression
    );
    update_policy(client, bucket_name, |p| {
        p.add_conditional_binding(role, member, condition)
    })
    .await?;
    writeln!(w, "{}", summary)?;
    Ok(())
}

pub async fn remove_bucket_conditional_iam_binding(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket_name: &str,
    role: &str,
    condition: &Expr,
) -> GcpResult<()> {
    let mut removed = false;
    update_policy(client, bucket_name, |p| {
        removed = p.remove_conditional_binding(role, condition);
    })
    .await?;
    if removed {
        writeln!(w, "Removed conditional binding for {} from {}", role, bucket_name)?;
    } else {
        writeln!(w, "No matching conditional binding for {} on {}", role, bucket_name)?;
    }
    Ok(())
}

// ── Uniform bucket-level access ─────────────────────────────────────

async fn set_uniform_bucket_level_access(
    client: &mut GcpClient,
    bucket_name: &str,
    enabled: bool,
) -> GcpResult<Bucket> {
    let patch = json!({ "iamConfiguration": { "uniformBucketLevelAccess": { "enabled": enabled } } });
    StorageClient::patch_bucket(client, bucket_name, &patch)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).Update", bucket_name)))
}

pub async fn enable_uniform_bucket_level_access(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket_name: &str,
) -> GcpResult<()> {
    set_uniform_bucket_level_access(client, bucket_name, true).await?;
    writeln!(w, "Uniform bucket-level access was enabled for {}", bucket_name)?;
    Ok(())
}

pub async fn disable_uniform_bucket_level_access(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket_name: &str,
) -> GcpResult<()> {
    set_uniform_bucket_level_access(client, bucket_name, false).await?;
    writeln!(w, "Uniform bucket-level access was disabled for {}", bucket_name)?;
    Ok(())
}

pub async fn get_uniform_bucket_level_access(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket_name: &str,
) -> GcpResult<UniformBucketLevelAccess> {
    let bucket = StorageClient::get_bucket(client, bucket_name)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).Attrs", bucket_name)))?;
    let ubla = bucket.uniform_bucket_level_access().cloned().unwrap_or_default();
    if ubla.enabled {
        writeln!(w, "Uniform bucket-level access is enabled for {:?}.", bucket_name)?;
        if let Some(ref locked) = ubla.locked_time {
            writeln!(w, "Bucket will be locked on {:?}.", locked)?;
        }
    } else {
        writeln!(w, "Uniform bucket-level access is not enabled for {:?}.", bucket_name)?;
    }
    Ok(ubla)
}

// ── Requester pays ──────────────────────────────────────────────────

async fn set_requester_pays(client: &mut GcpClient, bucket_name: &str, enabled: bool) -> GcpResult<Bucket> {
    let patch = json!({ "billing": { "requesterPays": enabled } });
    StorageClient::patch_bucket(client, bucket_name, &patch)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).Update", bucket_name)))
}

pub async fn enable_requester_pays(client: &mut GcpClient, w: &mut impl Write, bucket_name: &str) -> GcpResult<()> {
    set_requester_pays(client, bucket_name, true).await?;
    writeln!(w, "Requester pays enabled for bucket {}", bucket_name)?;
    Ok(())
}

pub async fn disable_requester_pays(client: &mut GcpClient, w: &mut impl Write, bucket_name: &str) -> GcpResult<()> {
    set_requester_pays(client, bucket_name, false).await?;
    writeln!(w, "Requester pays disabled for bucket {}", bucket_name)?;
    Ok(())
}

pub async fn get_requester_pays_status(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket_name: &str,
) -> GcpResult<bool> {
    let bucket = StorageClient::get_bucket(client, bucket_name)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).Attrs", bucket_name)))?;
    let enabled = bucket.requester_pays();
    writeln!(w, "Is requester pays enabled? {}", enabled)?;
    Ok(enabled)
}

// ── Encryption ──────────────────────────────────────────────────────

/// Encrypt new objects with a Cloud KMS key by default.
pub async fn set_bucket_default_kms_key(
    client: &mut GcpClient,
    w: &mut impl Write,
    bucket_name: &str,
    kms_key_name: &str,
) -> GcpResult<()> {
    let patch = json!({ "encryption": { "defaultKmsKeyName": kms_key_name } });
    let bucket = StorageClient::patch_bucket(client, bucket_name, &patch)
        .await
        .map_err(|e| e.with_method(&format!("Bucket({:?}).Update", bucket_name)))?;
    writeln!(w, "Default KMS Key Name: {}", bucket.default_kms_key_name().unwrap_or(kms_key_name))?;
    Ok(())
}

/// `projects/{p}/locations/global/keyRings/{r}/cryptoKeys/{k}`
pub fn global_kms_key_name(project_id: &str, key_ring: &str, crypto_key: &str) -> String {
    format!(
        "projects/{}/locations/global/keyRings/{}/cryptoKeys/{}",
        project_id, key_ring, crypto_key
    )
}
