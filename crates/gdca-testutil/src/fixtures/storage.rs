//! Bucket fixture: start every storage test run from an empty bucket.

use super::FixtureError;
use crate::retry::RetryPolicy;
use gdca_gcp::storage::{Bucket, ListObjectsOptions, StorageClient};
use gdca_gcp::GcpClient;
use std::time::Duration;

const DELETE_POLICY: RetryPolicy = RetryPolicy::new(10, Duration::from_secs(2));
const CREATE_POLICY: RetryPolicy = RetryPolicy::new(10, Duration::from_secs(10));

/// Delete `bucket` (every object version first) if it exists, then create
/// it again. Each step goes through the retry poller.
pub async fn clean_bucket(client: &GcpClient, project: &str, bucket: &str) -> Result<(), FixtureError> {
    let mut c = client.clone();
    match StorageClient::get_bucket(&mut c, bucket).await {
        Ok(_) => empty_and_delete(client, bucket).await?,
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    CREATE_POLICY
        .run(|_| {
            let mut c = client.clone();
            async move {
                let spec = Bucket {
                    name: bucket.to_string(),
                    ..Default::default()
                };
                match StorageClient::create_bucket(&mut c, project, &spec).await {
                    Err(e) if e.is_already_exists() => Ok(()),
                    other => other.map(|_| ()),
                }
            }
        })
        .await
        .map_err(|source| FixtureError::Retry {
            what: format!("create bucket {}", bucket),
            source,
        })?;
    log::info!("bucket {} is clean", bucket);
    Ok(())
}

async fn empty_and_delete(client: &GcpClient, bucket: &str) -> Result<(), FixtureError> {
    let mut c = client.clone();
    let listing = StorageClient::list_objects(
        &mut c,
        bucket,
        &ListObjectsOptions {
            versions: true,
            ..Default::default()
        },
    )
    .await?;

    for object in &listing.objects {
        let generation = object.generation_number();
        DELETE_POLICY
            .run(|_| {
                let mut c = client.clone();
                async move {
                    match StorageClient::delete_object(&mut c, bucket, &object.name, Some(generation))
                        .await
                    {
                        Err(e) if e.is_not_found() => Ok(()),
                        other => other,
                    }
                }
            })
            .await
            .map_err(|source| FixtureError::Retry {
                what: format!("delete gs://{}/{}#{}", bucket, object.name, generation),
                source,
            })?;
    }

    DELETE_POLICY
        .run(|_| {
            let mut c = client.clone();
            async move {
                match StorageClient::delete_bucket(&mut c, bucket).await {
                    Err(e) if e.is_not_found() => Ok(()),
                    other => other,
                }
            }
        })
        .await
        .map_err(|source| FixtureError::Retry {
            what: format!("delete bucket {}", bucket),
            source,
        })
}
