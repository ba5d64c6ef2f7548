//! Managing Pub/Sub topics.

use gdca_gcp::pubsub::{PubSubClient, Topic};
use gdca_gcp::{GcpClient, GcpResult};
use std::collections::HashMap;
use std::io::Write;

pub async fn create(
    client: &mut GcpClient,
    w: &mut impl Write,
    project_id: &str,
    topic_id: &str,
) -> GcpResult<Topic> {
    let topic = PubSubClient::create_topic(client, project_id, topic_id, HashMap::new())
        .await
        .map_err(|e| e.with_method("CreateTopic"))?;
    writeln!(w, "Topic created: {}", topic.name)?;
    Ok(topic)
}
