//! Google Cloud Logging client.
//!
//! Covers writing, listing and deleting log entries.
//!
//! API base: `https://logging.googleapis.com/v2`

use crate::client::{encode_segment, GcpClient};
use crate::error::GcpResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const SERVICE: &str = "logging";
const V2: &str = "/v2";

// ── Types ───────────────────────────────────────────────────────────────

/// A single log entry. Exactly one payload should be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub log_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<MonitoredResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

impl LogEntry {
    pub fn text(payload: impl Into<String>) -> Self {
        Self {
            text_payload: Some(payload.into()),
            ..Default::default()
        }
    }

    pub fn json(payload: serde_json::Value) -> Self {
        Self {
            json_payload: Some(payload),
            ..Default::default()
        }
    }

    pub fn with_severity(mut self, severity: &str) -> Self {
        self.severity = Some(severity.to_string());
        self
    }
}

/// The resource an entry is attributed to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoredResource {
    #[serde(default, rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl MonitoredResource {
    /// The `global` resource of a project.
    pub fn global(project: &str) -> Self {
        Self {
            resource_type: "global".to_string(),
            labels: HashMap::from([("project_id".to_string(), project.to_string())]),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEntriesResponse {
    #[serde(default)]
    entries: Vec<LogEntry>,
}

/// `projects/{project}/logs/{log_id}` with the log ID URL-encoded.
pub fn log_name(project: &str, log_id: &str) -> String {
    format!("projects/{}/logs/{}", project, encode_segment(log_id))
}

// ── Cloud Logging Client ────────────────────────────────────────────────

pub struct LoggingClient;

impl LoggingClient {
    /// Write entries to a log. Entries without their own log name or
    /// resource inherit `log_id` and the project's global resource.
    pub async fn write_entries(
        client: &mut GcpClient,
        project: &str,
        log_id: &str,
        entries: &[LogEntry],
    ) -> GcpResult<()> {
        let path = format!("{}/entries:write", V2);
        let body = serde_json::json!({
            "logName": log_name(project, log_id),
            "resource": MonitoredResource::global(project),
            "entries": entries,
        });
        client.post_text(SERVICE, &path, &body).await?;
        Ok(())
    }

    /// List the newest entries matching a filter.
    pub async fn list_entries(
        client: &mut GcpClient,
        project: &str,
        filter: Option<&str>,
        page_size: u32,
    ) -> GcpResult<Vec<LogEntry>> {
        let path = format!("{}/entries:list", V2);
        let body = serde_json::json!({
            "resourceNames": [format!("projects/{}", project)],
            "filter": filter.unwrap_or(""),
            "orderBy": "timestamp desc",
            "pageSize": page_size,
        });
        let resp: ListEntriesResponse = client.post(SERVICE, &path, &body).await?;
        Ok(resp.entries)
    }

    /// Delete a log and all its entries.
    pub async fn delete_log(client: &mut GcpClient, project: &str, log_id: &str) -> GcpResult<()> {
        let path = format!("{}/{}", V2, log_name(project, log_id));
        client.delete(SERVICE, &path, &[]).await?;
        Ok(())
    }
}
