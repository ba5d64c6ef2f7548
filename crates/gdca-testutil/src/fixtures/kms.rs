//! Cloud KMS fixture.
//!
//! Key rings cannot be deleted, so each run creates a fresh ring with a
//! random ID and cleanup destroys the key versions created in it.

use super::FixtureError;
use gdca_gcp::kms::{location_name, KmsClient};
use gdca_gcp::GcpClient;

/// Location of the fixture's key ring.
pub const LOCATION: &str = "us-east1";

pub struct KmsFixture {
    pub project_id: String,
    /// `projects/{p}/locations/us-east1/keyRings/{random}`
    pub key_ring_name: String,
    client: GcpClient,
}

impl KmsFixture {
    pub async fn new(client: &GcpClient, project_id: &str) -> Result<Self, FixtureError> {
        let mut client = client.clone();
        let ring = KmsClient::create_key_ring(
            &mut client,
            &location_name(project_id, LOCATION),
            &random_id(),
        )
        .await?;
        log::info!("created key ring {}", ring.name);
        Ok(Self {
            project_id: project_id.to_string(),
            key_ring_name: ring.name,
            client,
        })
    }

    /// A fresh resource ID for a key in this ring.
    pub fn random_id(&self) -> String {
        random_id()
    }

    /// Destroy every enabled version of every key in the ring.
    pub async fn cleanup(&mut self) -> Result<(), FixtureError> {
        let keys = KmsClient::list_crypto_keys(&mut self.client, &self.key_ring_name).await?;
        for key in keys {
            let versions =
                KmsClient::list_crypto_key_versions(&mut self.client, &key.name, Some("state=ENABLED"))
                    .await?;
            for version in versions {
                KmsClient::destroy_crypto_key_version(&mut self.client, &version.name).await?;
                log::debug!("destroyed {}", version.name);
            }
        }
        Ok(())
    }
}

/// Random ID valid for KMS resources (`[a-zA-Z0-9_-]{1,63}`).
pub fn random_id() -> String {
    format!("gdca-{}", uuid::Uuid::new_v4().simple())
}
