//! Cluster listing against a live project. Slow; end-to-end only.

use gdca_samples::container::listclusters;
use gdca_testutil::TestContext;

#[tokio::test]
async fn list_clusters() {
    let Some(tc) = TestContext::end_to_end() else { return };
    let mut client = tc.client().unwrap();

    let mut out = Vec::new();
    let clusters = listclusters::list_clusters(&mut client, &mut out, &tc.project_id, "us-central1-c")
        .await
        .unwrap();
    assert_eq!(String::from_utf8(out).unwrap().lines().count(), clusters.len());
}
