//! Compute samples against a live project.

use gdca_gcp::compute::ComputeClient;
use gdca_samples::compute::instances;
use gdca_testutil::{RetryPolicy, TestContext};
use std::time::Duration;

#[tokio::test]
async fn aggregated_list() {
    let Some(tc) = TestContext::system() else { return };
    let mut client = tc.client().unwrap();

    let mut out = Vec::new();
    let list = instances::aggregated_list(&mut client, &mut out, &tc.project_id)
        .await
        .unwrap();
    let lines = String::from_utf8(out).unwrap().lines().count();
    assert_eq!(lines, list.by_zone().count());
}

#[tokio::test]
async fn instance_lifecycle() {
    let Some(tc) = TestContext::end_to_end() else { return };
    let mut client = tc.client().unwrap();
    let zone = "us-central1-b";
    let name = format!("gdca-e2e-{}", chrono::Utc::now().timestamp_millis());

    let mut out = Vec::new();
    let before = instances::list(&mut client, &mut out, &tc.project_id, zone)
        .await
        .unwrap();
    assert!(before.iter().all(|i| i.name != name));

    let mut out = Vec::new();
    let op = instances::insert(&mut client, &mut out, &tc.project_id, zone, &name)
        .await
        .unwrap();
    assert!(String::from_utf8(out).unwrap().starts_with(&format!("Insert of {} started", name)));
    assert!(!op.name.is_empty());

    // The instance shows up once the insert has been accepted.
    let instance = RetryPolicy::new(10, Duration::from_secs(1))
        .run(|_| {
            let mut client = client.clone();
            let (project, name) = (tc.project_id.clone(), name.clone());
            async move { instances::get(&mut client, &mut Vec::new(), &project, zone, &name).await }
        })
        .await
        .unwrap();
    assert_eq!(instance.name, name);

    let mut out = Vec::new();
    let op = instances::delete(&mut client, &mut out, &tc.project_id, zone, &name)
        .await
        .unwrap();
    assert!(String::from_utf8(out).unwrap().starts_with(&format!("Delete of {} started", name)));
    ComputeClient::wait_for_zone_operation(
        &mut client,
        &tc.project_id,
        zone,
        &op.name,
        60,
        Duration::from_secs(5),
    )
    .await
    .unwrap();
}
