//! Listing GKE clusters.

use gdca_gcp::gke::{Cluster, GkeClient};
use gdca_gcp::{GcpClient, GcpResult};
use std::io::Write;

fn describe(cluster: &Cluster) -> String {
    let pools: Vec<&str> = cluster.node_pools.iter().map(|p| p.name.as_str()).collect();
    format!(
        "Cluster {:?} ({}) master_version: v{} node pools: [{}]",
        cluster.name,
        cluster.status,
        cluster.current_master_version,
        pools.join(", ")
    )
}

/// Clusters in `location` (a zone, a region, or `-` for all); one line each.
pub async fn list_clusters(
    client: &mut GcpClient,
    w: &mut impl Write,
    project_id: &str,
    location: &str,
) -> GcpResult<Vec<Cluster>> {
    let clusters = GkeClient::list_clusters(client, project_id, location)
        .await
        .map_err(|e| e.with_method("ListClusters"))?;
    for cluster in &clusters {
        writeln!(w, "{}", describe(cluster))?;
    }
    Ok(clusters)
}
