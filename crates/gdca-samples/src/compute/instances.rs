//! Managing Compute Engine VM instances.

use gdca_gcp::compute::{
    AccessConfig, AttachedDisk, AttachedDiskInitializeParams, ComputeClient, Instance,
    InstanceAggregatedList, NetworkInterface, Operation, ServiceAccount, COMPUTE_SCOPE,
    DEVSTORAGE_FULL_CONTROL_SCOPE,
};
use gdca_gcp::{GcpClient, GcpResult};
use std::io::Write;

const SOURCE_IMAGE: &str = "projects/debian-cloud/global/images/family/debian-12";

/// Instances of every zone of a project; writes one line per non-empty zone.
pub async fn aggregated_list(
    client: &mut GcpClient,
    w: &mut impl Write,
    project_id: &str,
) -> GcpResult<InstanceAggregatedList> {
    let list = ComputeClient::aggregated_list(client, project_id)
        .await
        .map_err(|e| e.with_method("Instances.AggregatedList"))?;
    for (zone, instances) in list.by_zone() {
        writeln!(w, "{}: {} instance(s)", zone, instances.len())?;
    }
    Ok(list)
}

/// Instances of one zone.
pub async fn list(
    client: &mut GcpClient,
    w: &mut impl Write,
    project_id: &str,
    zone: &str,
) -> GcpResult<Vec<Instance>> {
    let instances = ComputeClient::list_instances(client, project_id, zone)
        .await
        .map_err(|e| e.with_method("Instances.List"))?;
    for instance in &instances {
        writeln!(w, "{}", instance.name)?;
    }
    Ok(instances)
}

pub async fn get(
    client: &mut GcpClient,
    w: &mut impl Write,
    project_id: &str,
    zone: &str,
    name: &str,
) -> GcpResult<Instance> {
    let instance = ComputeClient::get_instance(client, project_id, zone, name)
        .await
        .map_err(|e| e.with_method("Instances.Get"))?;
    writeln!(
        w,
        "Instance {} is {}",
        instance.name,
        instance.status.as_deref().unwrap_or("UNKNOWN")
    )?;
    Ok(instance)
}

/// The instance created by [`insert`]: n1-standard-1, Debian boot disk,
/// external NAT, default service account with storage and compute scopes.
pub fn sample_instance(project_id: &str, zone: &str, name: &str) -> Instance {
    let prefix = format!("projects/{}", project_id);
    Instance {
        name: name.to_string(),
        description: Some("compute sample instance".to_string()),
        machine_type: format!("zones/{}/machineTypes/n1-standard-1", zone),
        disks: vec![AttachedDisk {
            auto_delete: true,
            boot: true,
            disk_type: Some("PERSISTENT".to_string()),
            source: None,
            initialize_params: Some(AttachedDiskInitializeParams {
                disk_name: Some(format!("{}-root-pd", name)),
                source_image: Some(SOURCE_IMAGE.to_string()),
                disk_size_gb: None,
            }),
        }],
        network_interfaces: vec![NetworkInterface {
            network: format!("{}/global/networks/default", prefix),
            access_configs: vec![AccessConfig {
                name: "External NAT".to_string(),
                config_type: "ONE_TO_ONE_NAT".to_string(),
                nat_ip: None,
            }],
            ..Default::default()
        }],
        service_accounts: vec![ServiceAccount {
            email: "default".to_string(),
            scopes: vec![
                DEVSTORAGE_FULL_CONTROL_SCOPE.to_string(),
                COMPUTE_SCOPE.to_string(),
            ],
        }],
        ..Default::default()
    }
}

/// Start creating an instance. Returns the zone operation.
pub async fn insert(
    client: &mut GcpClient,
    w: &mut impl Write,
    project_id: &str,
    zone: &str,
    name: &str,
) -> GcpResult<Operation> {
    let instance = sample_instance(project_id, zone, name);
    let op = ComputeClient::insert_instance(client, project_id, zone, &instance)
        .await
        .map_err(|e| e.with_method("Instances.Insert"))?;
    writeln!(w, "Insert of {} started: {}", name, op.name)?;
    Ok(op)
}

pub async fn delete(
    client: &mut GcpClient,
    w: &mut impl Write,
    project_id: &str,
    zone: &str,
    name: &str,
) -> GcpResult<Operation> {
    let op = ComputeClient::delete_instance(client, project_id, zone, name)
        .await
        .map_err(|e| e.with_method("Instances.Delete"))?;
    writeln!(w, "Delete of {} started: {}", name, op.name)?;
    Ok(op)
}
