//! Google Kubernetes Engine (GKE) client.
//!
//! API base: `https://container.googleapis.com/v1`

use crate::client::GcpClient;
use crate::error::GcpResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const SERVICE: &str = "container";
const V1: &str = "/v1";

// ── Types ───────────────────────────────────────────────────────────────

/// GKE cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub current_master_version: String,
    #[serde(default)]
    pub current_node_count: u32,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub node_pools: Vec<NodePool>,
    #[serde(default)]
    pub resource_labels: HashMap<String, String>,
    #[serde(default)]
    pub self_link: String,
    #[serde(default)]
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub initial_node_count: u32,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClusterList {
    #[serde(default)]
    clusters: Vec<Cluster>,
}

// ── GKE Client ──────────────────────────────────────────────────────────

pub struct GkeClient;

impl GkeClient {
    /// List GKE clusters in a location (use "-" for all locations).
    pub async fn list_clusters(
        client: &mut GcpClient,
        project: &str,
        location: &str,
    ) -> GcpResult<Vec<Cluster>> {
        let path = format!("{}/projects/{}/locations/{}/clusters", V1, project, location);
        let resp: ClusterList = client.get(SERVICE, &path, &[]).await?;
        Ok(resp.clusters)
    }

    /// Get a specific cluster.
    pub async fn get_cluster(
        client: &mut GcpClient,
        project: &str,
        location: &str,
        cluster_name: &str,
    ) -> GcpResult<Cluster> {
        let path = format!(
            "{}/projects/{}/locations/{}/clusters/{}",
            V1, project, location, cluster_name
        );
        client.get(SERVICE, &path, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_location_has_no_clusters() {
        let list: ClusterList = serde_json::from_str("{}").unwrap();
        assert!(list.clusters.is_empty());
    }

    #[test]
    fn parses_cluster_with_node_pools() {
        let cluster: Cluster = serde_json::from_str(
            r#"{
                "name": "c1",
                "location": "us-central1-c",
                "status": "RUNNING",
                "currentMasterVersion": "1.29.1-gke.1589",
                "nodePools": [{ "name": "default-pool", "initialNodeCount": 3 }]
            }"#,
        )
        .unwrap();
        assert_eq!(cluster.node_pools[0].initial_node_count, 3);
        assert_eq!(cluster.current_master_version, "1.29.1-gke.1589");
    }
}
