//! Google Compute Engine client.
//!
//! Covers VM instances and zone operations.
//!
//! API base: `https://compute.googleapis.com/compute/v1`

use crate::client::GcpClient;
use crate::error::{GcpError, GcpResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

const SERVICE: &str = "compute";
const V1: &str = "/compute/v1";

/// Full control of Cloud Storage.
pub const DEVSTORAGE_FULL_CONTROL_SCOPE: &str =
    "https://www.googleapis.com/auth/devstorage.full_control";
/// View and manage Compute Engine resources.
pub const COMPUTE_SCOPE: &str = "https://www.googleapis.com/auth/compute";

// ── Types ───────────────────────────────────────────────────────────────

/// Compute Engine instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub machine_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<AttachedDisk>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_interfaces: Vec<NetworkInterface>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_accounts: Vec<ServiceAccount>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub boot: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub disk_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialize_params: Option<AttachedDiskInitializeParams>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDiskInitializeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(default)]
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,
    #[serde(default, rename = "networkIP", skip_serializing_if = "Option::is_none")]
    pub network_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_configs: Vec<AccessConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub config_type: String,
    #[serde(default, rename = "natIP", skip_serializing_if = "Option::is_none")]
    pub nat_ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceAccount {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// GCE operation (long-running Compute action).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub operation_type: String,
    #[serde(default)]
    pub target_link: Option<String>,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub self_link: String,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl Operation {
    pub fn is_done(&self) -> bool {
        self.status == "DONE"
    }
}

/// Instances of one scope (`zones/us-central1-a`) in an aggregated list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstancesScopedList {
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub warning: Option<serde_json::Value>,
}

/// Response of `instances.aggregatedList`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceAggregatedList {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub items: BTreeMap<String, InstancesScopedList>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl InstanceAggregatedList {
    /// Scopes that actually contain instances, with their instances.
    pub fn by_zone(&self) -> impl Iterator<Item = (&str, &[Instance])> {
        self.items
            .iter()
            .filter(|(_, scoped)| !scoped.instances.is_empty())
            .map(|(scope, scoped)| {
                (
                    scope.strip_prefix("zones/").unwrap_or(scope),
                    scoped.instances.as_slice(),
                )
            })
    }

    pub fn instance_count(&self) -> usize {
        self.items.values().map(|s| s.instances.len()).sum()
    }
}

// ── List response wrappers ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

// ── Compute Engine Client ───────────────────────────────────────────────

pub struct ComputeClient;

impl ComputeClient {
    /// List instances across all zones of a project.
    pub async fn aggregated_list(
        client: &mut GcpClient,
        project: &str,
    ) -> GcpResult<InstanceAggregatedList> {
        let path = format!("{}/projects/{}/aggregated/instances", V1, project);
        client.get(SERVICE, &path, &[]).await
    }

    /// List instances in a zone (all pages).
    pub async fn list_instances(
        client: &mut GcpClient,
        project: &str,
        zone: &str,
    ) -> GcpResult<Vec<Instance>> {
        let path = format!("{}/projects/{}/zones/{}/instances", V1, project, zone);
        client
            .get_all_pages(SERVICE, &path, &[], |page: ListResponse<Instance>| {
                (page.items, page.next_page_token)
            })
            .await
    }

    /// Get a single instance by name.
    pub async fn get_instance(
        client: &mut GcpClient,
        project: &str,
        zone: &str,
        instance_name: &str,
    ) -> GcpResult<Instance> {
        let path = format!(
            "{}/projects/{}/zones/{}/instances/{}",
            V1, project, zone, instance_name
        );
        client.get(SERVICE, &path, &[]).await
    }

    /// Create an instance. Returns the zone operation tracking the insert.
    pub async fn insert_instance(
        client: &mut GcpClient,
        project: &str,
        zone: &str,
        instance: &Instance,
    ) -> GcpResult<Operation> {
        let path = format!("{}/projects/{}/zones/{}/instances", V1, project, zone);
        client.post(SERVICE, &path, instance).await
    }

    /// Delete an instance.
    pub async fn delete_instance(
        client: &mut GcpClient,
        project: &str,
        zone: &str,
        instance_name: &str,
    ) -> GcpResult<Operation> {
        let path = format!(
            "{}/projects/{}/zones/{}/instances/{}",
            V1, project, zone, instance_name
        );
        let text = client.delete(SERVICE, &path, &[]).await?;
        serde_json::from_str(&text).map_err(|e| GcpError::decode(SERVICE, e))
    }

    /// Get a zone operation.
    pub async fn get_zone_operation(
        client: &mut GcpClient,
        project: &str,
        zone: &str,
        operation: &str,
    ) -> GcpResult<Operation> {
        let path = format!(
            "{}/projects/{}/zones/{}/operations/{}",
            V1, project, zone, operation
        );
        client.get(SERVICE, &path, &[]).await
    }

    /// Poll a zone operation until it reports `DONE`.
    pub async fn wait_for_zone_operation(
        client: &mut GcpClient,
        project: &str,
        zone: &str,
        operation: &str,
        max_polls: u32,
        poll_interval: Duration,
    ) -> GcpResult<Operation> {
        let path = format!(
            "{}/projects/{}/zones/{}/operations/{}",
            V1, project, zone, operation
        );
        let value = client
            .wait_for_operation(SERVICE, &path, max_polls, poll_interval)
            .await?;
        serde_json::from_value(value).map_err(|e| GcpError::decode(SERVICE, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregated_list_groups_by_zone() {
        let json = r#"{
            "id": "projects/p/aggregated/instances",
            "items": {
                "zones/us-central1-a": { "instances": [ { "name": "a1", "machineType": "n1" } ] },
                "zones/us-central1-b": { "warning": { "code": "NO_RESULTS_ON_PAGE" } },
                "zones/europe-west1-b": { "instances": [ { "name": "e1" }, { "name": "e2" } ] }
            }
        }"#;
        let list: InstanceAggregatedList = serde_json::from_str(json).unwrap();
        assert_eq!(list.instance_count(), 3);
        let zones: Vec<&str> = list.by_zone().map(|(z, _)| z).collect();
        assert_eq!(zones, vec!["europe-west1-b", "us-central1-a"]);
    }

    #[test]
    fn insert_body_omits_server_fields() {
        let instance = Instance {
            name: "vm-1".into(),
            machine_type: "zones/us-central1-b/machineTypes/n1-standard-1".into(),
            ..Default::default()
        };
        let body = serde_json::to_value(&instance).unwrap();
        assert_eq!(body["name"], "vm-1");
        assert!(body.get("id").is_none());
        assert!(body.get("status").is_none());
        assert!(body.get("disks").is_none());
    }

    #[test]
    fn network_interface_uses_wire_names() {
        let nic = NetworkInterface {
            network: "global/networks/default".into(),
            access_configs: vec![AccessConfig {
                name: "External NAT".into(),
                config_type: "ONE_TO_ONE_NAT".into(),
                nat_ip: None,
            }],
            ..Default::default()
        };
        let body = serde_json::to_value(&nic).unwrap();
        assert_eq!(body["accessConfigs"][0]["type"], "ONE_TO_ONE_NAT");
        assert!(body["accessConfigs"][0].get("natIP").is_none());
    }

    #[test]
    fn operation_done_status() {
        let op: Operation =
            serde_json::from_str(r#"{"name":"operation-1","status":"DONE"}"#).unwrap();
        assert!(op.is_done());
    }
}
