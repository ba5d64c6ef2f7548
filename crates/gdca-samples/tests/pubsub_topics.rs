//! Topic samples against a live project.

use gdca_gcp::pubsub::PubSubClient;
use gdca_gcp::GcpClient;
use gdca_samples::pubsub::topics;
use gdca_testutil::{RunOnce, TestContext};

const TOPIC_ID: &str = "test-topic";

static CLEANUP: RunOnce<()> = RunOnce::new();

/// Delete the topic left by an earlier run, once per process.
async fn setup(client: &GcpClient, project_id: &str) {
    CLEANUP
        .run(|| async {
            let mut client = client.clone();
            match PubSubClient::topic_exists(&mut client, project_id, TOPIC_ID).await {
                Ok(true) => {
                    if let Err(e) = PubSubClient::delete_topic(&mut client, project_id, TOPIC_ID).await {
                        log::warn!("deleting stale topic {}: {}", TOPIC_ID, e);
                    }
                }
                Ok(false) => {}
                Err(e) => log::warn!("checking topic {}: {}", TOPIC_ID, e),
            }
        })
        .await;
}

#[tokio::test]
async fn create_topic() {
    let Some(tc) = TestContext::system() else { return };
    let mut client = tc.client().unwrap();
    setup(&client, &tc.project_id).await;

    let mut out = Vec::new();
    let topic = topics::create(&mut client, &mut out, &tc.project_id, TOPIC_ID)
        .await
        .unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Topic created:"), "got {:?}", out);
    assert_eq!(topic.id(), TOPIC_ID);
    assert!(PubSubClient::topic_exists(&mut client, &tc.project_id, TOPIC_ID)
        .await
        .unwrap());

    PubSubClient::delete_topic(&mut client, &tc.project_id, TOPIC_ID)
        .await
        .unwrap();
}
