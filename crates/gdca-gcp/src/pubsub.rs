//! Google Cloud Pub/Sub client.
//!
//! Covers topic administration.
//!
//! API base: `https://pubsub.googleapis.com/v1`

use crate::client::GcpClient;
use crate::error::GcpResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const SERVICE: &str = "pubsub";
const V1: &str = "/v1";

// ── Types ───────────────────────────────────────────────────────────────

/// Pub/Sub topic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    /// Full resource name: `projects/{project}/topics/{topic}`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_retention_duration: Option<String>,
}

impl Topic {
    /// Short topic ID (last path segment of the resource name).
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopicList {
    #[serde(default)]
    topics: Vec<Topic>,
    #[serde(default)]
    next_page_token: Option<String>,
}

fn topic_path(project: &str, topic_id: &str) -> String {
    format!("{}/projects/{}/topics/{}", V1, project, topic_id)
}

// ── Pub/Sub Client ──────────────────────────────────────────────────────

pub struct PubSubClient;

impl PubSubClient {
    /// List topics in a project (all pages).
    pub async fn list_topics(client: &mut GcpClient, project: &str) -> GcpResult<Vec<Topic>> {
        let path = format!("{}/projects/{}/topics", V1, project);
        client
            .get_all_pages(SERVICE, &path, &[], |page: TopicList| {
                (page.topics, page.next_page_token)
            })
            .await
    }

    /// Get a topic.
    pub async fn get_topic(client: &mut GcpClient, project: &str, topic_id: &str) -> GcpResult<Topic> {
        client.get(SERVICE, &topic_path(project, topic_id), &[]).await
    }

    /// Whether a topic exists. Any failure other than NOT_FOUND is returned.
    pub async fn topic_exists(client: &mut GcpClient, project: &str, topic_id: &str) -> GcpResult<bool> {
        match Self::get_topic(client, project, topic_id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create a topic.
    pub async fn create_topic(
        client: &mut GcpClient,
        project: &str,
        topic_id: &str,
        labels: HashMap<String, String>,
    ) -> GcpResult<Topic> {
        let body = Topic {
            labels,
            ..Default::default()
        };
        client.put(SERVICE, &topic_path(project, topic_id), &body).await
    }

    /// Delete a topic.
    pub async fn delete_topic(client: &mut GcpClient, project: &str, topic_id: &str) -> GcpResult<()> {
        client
            .delete(SERVICE, &topic_path(project, topic_id), &[])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_id_is_last_segment() {
        let topic: Topic =
            serde_json::from_str(r#"{"name":"projects/p/topics/test-topic"}"#).unwrap();
        assert_eq!(topic.id(), "test-topic");
    }

    #[test]
    fn create_body_is_empty_without_labels() {
        let body = serde_json::to_value(Topic::default()).unwrap();
        assert_eq!(body, serde_json::json!({}));
    }
}
